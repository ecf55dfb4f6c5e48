use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "userrole", rename_all = "snake_case")]
pub(crate) enum UserRole {
    SuperAdmin,
    Admin,
    Recruiter,
    Student,
}

impl UserRole {
    pub(crate) fn is_admin(self) -> bool {
        matches!(self, UserRole::SuperAdmin | UserRole::Admin)
    }

    /// Roles allowed to author questions and tests.
    pub(crate) fn is_author(self) -> bool {
        matches!(self, UserRole::SuperAdmin | UserRole::Admin | UserRole::Recruiter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "organizationtype", rename_all = "lowercase")]
pub(crate) enum OrganizationType {
    Company,
    Institution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questiontype", rename_all = "snake_case")]
pub(crate) enum QuestionType {
    Mcq,
    MultipleSelect,
    Subjective,
    Coding,
}

impl QuestionType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::MultipleSelect => "multiple_select",
            QuestionType::Subjective => "subjective",
            QuestionType::Coding => "coding",
        }
    }

    /// Only choice questions have a machine-checkable answer.
    pub(crate) fn is_auto_graded(self) -> bool {
        matches!(self, QuestionType::Mcq | QuestionType::MultipleSelect)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficultylevel", rename_all = "lowercase")]
pub(crate) enum DifficultyLevel {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "easy",
            DifficultyLevel::Medium => "medium",
            DifficultyLevel::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "sessionstatus", rename_all = "snake_case")]
pub(crate) enum SessionStatus {
    InProgress,
    Completed,
    Expired,
    Terminated,
}

impl SessionStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Expired => "expired",
            SessionStatus::Terminated => "terminated",
        }
    }
}

/// Stored as `under_review`, exposed over the API as `under-review`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "resultstatus", rename_all = "snake_case")]
pub(crate) enum ResultStatus {
    Pass,
    Fail,
    #[serde(alias = "under_review")]
    UnderReview,
}

impl ResultStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Pass => "pass",
            ResultStatus::Fail => "fail",
            ResultStatus::UnderReview => "under-review",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "violationseverity", rename_all = "lowercase")]
pub(crate) enum ViolationSeverity {
    Low,
    Medium,
    High,
}

impl ViolationSeverity {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ViolationSeverity::Low => "low",
            ViolationSeverity::Medium => "medium",
            ViolationSeverity::High => "high",
        }
    }
}

/// Proctoring strictness configured per test. `off` disables the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ProctoringLevel {
    Strict,
    #[default]
    Moderate,
    Off,
}
