use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use serde_json::Value;
use std::collections::HashMap;

use super::ApiJson;

use crate::error::ApiError;
use crate::storage::UploadedFile;

/// A fully read multipart body: text fields by name, files in arrival order
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field.bytes().await?.to_vec();
                    form.files.push(UploadedFile { field: name, filename, content_type, data });
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// Read either a multipart form or a JSON object body. JSON members become
    /// text fields; nulls are dropped and other scalars keep their JSON text.
    pub async fn read_any(request: Request) -> Result<Self, ApiError> {
        let is_multipart = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(request, &()).await?;
            return Self::read(multipart).await;
        }

        let ApiJson(body) = ApiJson::<Value>::from_request(request, &()).await?;
        Self::from_json(body)
    }

    pub fn from_json(body: Value) -> Result<Self, ApiError> {
        let Value::Object(members) = body else {
            return Err(ApiError::invalid_json("Request body must be a JSON object"));
        };
        let fields = members
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect();
        Ok(Self { fields, files: Vec::new() })
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Remove and return the first file sent under `name`
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|f| f.field == name)?;
        Some(self.files.remove(index))
    }

    /// Text fields as a JSON object of strings
    pub fn fields_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::json;

    #[test]
    fn test_from_json_flattens_members() {
        let form = MultipartForm::from_json(json!({
            "item_name": "Drill",
            "quantity": 3,
            "vendor_id": null,
        }))
        .unwrap();
        assert_eq!(form.field("item_name"), Some("Drill"));
        assert_eq!(form.field("quantity"), Some("3"));
        assert_eq!(form.field("vendor_id"), None);
        assert!(form.files.is_empty());
    }

    #[test]
    fn test_from_json_requires_object() {
        assert!(MultipartForm::from_json(json!(["a"])).is_err());
    }

    #[tokio::test]
    async fn test_read_any_multipart() {
        let body = "--XYZ\r\n\
Content-Disposition: form-data; name=\"item_name\"\r\n\r\n\
Drill\r\n\
--XYZ\r\n\
Content-Disposition: form-data; name=\"image\"; filename=\"drill.png\"\r\n\
Content-Type: image/png\r\n\r\n\
PNGDATA\r\n\
--XYZ--\r\n";
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
            .body(Body::from(body))
            .unwrap();

        let mut form = MultipartForm::read_any(request).await.unwrap();
        assert_eq!(form.field("item_name"), Some("Drill"));
        let file = form.take_file("image").unwrap();
        assert_eq!(file.filename, "drill.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.data, b"PNGDATA");
        assert!(form.take_file("image").is_none());
    }

    #[tokio::test]
    async fn test_read_any_json() {
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"serial_id":"S-1"}"#))
            .unwrap();
        let form = MultipartForm::read_any(request).await.unwrap();
        assert_eq!(form.field("serial_id"), Some("S-1"));
    }
}
