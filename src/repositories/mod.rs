pub(crate) mod health;
pub(crate) mod organizations;
pub(crate) mod proctoring_events;
pub(crate) mod profiles;
pub(crate) mod questions;
pub(crate) mod responses;
pub(crate) mod results;
pub(crate) mod sessions;
pub(crate) mod students;
pub(crate) mod tests;

use sqlx::{Postgres, QueryBuilder};

/// `%search%` with LIKE wildcards in `search` escaped.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for ch in search.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Appends a case-insensitive substring match of `search` against any of
/// `columns`. Each column expression is wrapped in `lower()`.
pub(crate) fn push_search(
    builder: &mut QueryBuilder<'_, Postgres>,
    columns: &[&str],
    search: Option<&str>,
) {
    let Some(search) = search.map(str::trim).filter(|value| !value.is_empty()) else {
        return;
    };
    let pattern = like_pattern(search);

    builder.push(" AND (");
    for (index, column) in columns.iter().enumerate() {
        if index > 0 {
            builder.push(" OR ");
        }
        builder.push(format!("lower({column}) LIKE "));
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\'");
    }
    builder.push(")");
}

#[cfg(test)]
mod search_tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Asha"), "%asha%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
