use serde_json::Value;

use crate::api::errors::ApiError;
use crate::db::types::QuestionType;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )))
    }
}

/// Emails are compared case-insensitively; store them trimmed and lowercase.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Listing filters treat a blank value and the literal `all` as "no filter".
pub(crate) fn optional_filter(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| {
        !value.is_empty() && !value.eq_ignore_ascii_case("all")
    })
}

fn option_index(value: &Value, option_count: usize) -> Option<usize> {
    let index = usize::try_from(value.as_u64()?).ok()?;
    (index < option_count).then_some(index)
}

/// Choice questions need at least two options and an answer key that points
/// at them; free-text questions carry no key requirements.
pub(crate) fn validate_question_shape(
    question_type: QuestionType,
    options: &[String],
    correct_answer: Option<&Value>,
    marks: f64,
) -> Result<(), ApiError> {
    if !(marks.is_finite() && marks > 0.0) {
        return Err(ApiError::BadRequest("marks must be greater than zero".to_string()));
    }
    if !question_type.is_auto_graded() {
        return Ok(());
    }

    if options.len() < 2 || options.iter().any(|option| option.trim().is_empty()) {
        return Err(ApiError::BadRequest(format!(
            "{} questions need at least two non-empty options",
            question_type.as_str()
        )));
    }

    let key_is_valid = match (question_type, correct_answer) {
        (QuestionType::Mcq, Some(value)) => option_index(value, options.len()).is_some(),
        (QuestionType::MultipleSelect, Some(Value::Array(items))) => {
            !items.is_empty()
                && items.iter().all(|item| option_index(item, options.len()).is_some())
        }
        _ => false,
    };
    if key_is_valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "correct_answer does not match the options of this {} question",
            question_type.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn optional_filter_drops_blank_and_all() {
        assert_eq!(optional_filter(None), None);
        assert_eq!(optional_filter(Some("  ".to_string())), None);
        assert_eq!(optional_filter(Some("All".to_string())), None);
        assert_eq!(optional_filter(Some(" MCA ".to_string())), Some("MCA".to_string()));
    }

    #[test]
    fn password_length_counts_characters() {
        assert!(validate_password_len("short").is_err());
        assert!(validate_password_len("пароль12").is_ok());
    }

    #[test]
    fn choice_questions_need_matching_key() {
        let options = vec!["A".to_string(), "B".to_string(), "C".to_string()];

        assert!(validate_question_shape(QuestionType::Mcq, &options, Some(&json!(2)), 1.0).is_ok());
        assert!(validate_question_shape(QuestionType::Mcq, &options, Some(&json!(3)), 1.0).is_err());
        assert!(validate_question_shape(QuestionType::Mcq, &options, None, 1.0).is_err());
        assert!(validate_question_shape(
            QuestionType::MultipleSelect,
            &options,
            Some(&json!([0, 2])),
            2.0
        )
        .is_ok());
        assert!(validate_question_shape(
            QuestionType::MultipleSelect,
            &options,
            Some(&json!(1)),
            2.0
        )
        .is_err());
        assert!(validate_question_shape(QuestionType::Coding, &[], None, 5.0).is_ok());
        assert!(validate_question_shape(QuestionType::Subjective, &[], None, 0.0).is_err());
    }
}
