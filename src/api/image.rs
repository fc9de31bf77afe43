use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};

use crate::storage::{ImageMeta, StoredImage};

/// Serve stored bytes with their content type; the checksum is the ETag and
/// a matching `If-None-Match` gets a 304
pub fn image_response(image: StoredImage, request_headers: &HeaderMap) -> Response {
    let etag = format!("\"{}\"", image.meta.checksum);
    let not_modified = request_headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|tag| tag.trim() == etag));

    let mut response = if not_modified {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        Response::new(Body::from(image.data))
    };

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, value);
    }
    if !not_modified {
        let content_type = HeaderValue::from_str(&image.meta.mimetype)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private, max-age=3600"));
    response
}

/// Body returned after a successful upload
pub fn upload_json(meta: &ImageMeta) -> Value {
    json!({
        "imageId": meta.image_id,
        "filename": meta.filename,
        "url": meta.url(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn stored() -> StoredImage {
        StoredImage {
            meta: ImageMeta {
                image_id: Uuid::nil(),
                org_id: None,
                kind: "item_image".to_string(),
                ref_id: None,
                filename: "drill.png".to_string(),
                mimetype: "image/png".to_string(),
                size: 3,
                checksum: "abc123".to_string(),
                created_at: Utc::now(),
            },
            data: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn test_serves_bytes_with_etag() {
        let response = image_response(stored(), &HeaderMap::new());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[header::ETAG], "\"abc123\"");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], &[1, 2, 3]);
    }

    #[test]
    fn test_matching_etag_is_not_modified() {
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"other\", \"abc123\""));
        let response = image_response(stored(), &headers);
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_upload_json() {
        let value = upload_json(&stored().meta);
        assert_eq!(value["filename"], "drill.png");
        assert_eq!(value["url"], "/upload/image/00000000-0000-0000-0000-000000000000/drill.png");
    }
}
