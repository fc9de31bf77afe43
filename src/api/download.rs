use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::Response,
};

use crate::storage::sanitize_filename;

/// File download with `Content-Disposition: attachment`
pub fn attachment(content_type: &'static str, filename: &str, body: impl Into<Body>) -> Response {
    let mut response = Response::new(body.into());
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    let disposition = format!("attachment; filename={}", sanitize_filename(filename));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

pub const CSV: &str = "text/csv; charset=utf-8";
pub const PDF: &str = "application/pdf";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_headers() {
        let response = attachment(CSV, "users.csv", "a,b\n");
        assert_eq!(response.headers()[header::CONTENT_TYPE], CSV);
        assert_eq!(response.headers()[header::CONTENT_DISPOSITION], "attachment; filename=users.csv");
    }
}
