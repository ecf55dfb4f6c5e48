use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub(crate) const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub(crate) const TEXT_CSV: &str = "text/csv; charset=utf-8";

/// Wraps a generated document as a file download.
pub(crate) fn attachment(body: String, content_type: &'static str, filename: &str) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response.headers_mut().insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", sanitize(filename)))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    response
}

fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_sets_disposition_with_safe_filename() {
        let response = attachment("body".to_string(), TEXT_PLAIN, "student \"21CS/001\".txt");
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .expect("disposition");
        assert_eq!(disposition, "attachment; filename=\"student__21CS_001_.txt\"");
    }
}
