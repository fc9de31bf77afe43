//! Binary attachments (user pictures, organization logos, item images, record
//! attachments) behind one storage seam.

#[cfg(test)]
pub(crate) mod memory;
pub mod postgres;

pub use postgres::PgImageStore;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use uuid::Uuid;

use crate::database::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Image not found")]
    NotFound,
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Image exceeds {max_bytes} bytes")]
    TooLarge { max_bytes: usize },
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(DatabaseError::Sqlx(err))
    }
}

/// What an attachment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    UserPicture,
    ProfilePicture,
    OrganizationLogo,
    OrganizationPhoto,
    ItemImage,
    Attachment,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::UserPicture => "user_picture",
            ImageKind::ProfilePicture => "profile_picture",
            ImageKind::OrganizationLogo => "organization_logo",
            ImageKind::OrganizationPhoto => "organization_photo",
            ImageKind::ItemImage => "item_image",
            ImageKind::Attachment => "attachment",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub org_id: Option<Uuid>,
    pub kind: ImageKind,
    /// Id of the owning record, if any
    pub ref_id: Option<String>,
    pub filename: String,
    pub mimetype: String,
    pub data: Vec<u8>,
    pub uploaded_by: Option<Uuid>,
}

/// A file received in a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl NewImage {
    pub fn from_upload(file: UploadedFile, kind: ImageKind, org_id: Uuid, uploaded_by: Uuid) -> Self {
        Self {
            org_id: Some(org_id),
            kind,
            ref_id: None,
            filename: sanitize_filename(&file.filename),
            mimetype: file.content_type,
            data: file.data,
            uploaded_by: Some(uploaded_by),
        }
    }

    /// Image from a base64 data URL, named `<stem>.<ext>` after its mimetype
    pub fn from_data_url(url: &str, kind: ImageKind, org_id: Uuid, uploaded_by: Uuid, stem: &str) -> Result<Self, StorageError> {
        let (mimetype, data) = decode_data_url(url)?;
        Ok(Self {
            org_id: Some(org_id),
            kind,
            ref_id: None,
            filename: sanitize_filename(&format!("{}.{}", stem, extension_for(&mimetype))),
            mimetype,
            data,
            uploaded_by: Some(uploaded_by),
        })
    }

    pub fn owned_by(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }

    /// Reject empty or oversized payloads, and anything that is not `image/*`
    pub fn validate_image(&self, max_bytes: usize) -> Result<(), StorageError> {
        if !self.mimetype.starts_with("image/") {
            return Err(StorageError::InvalidImage(format!(
                "Only image uploads are allowed, got '{}'",
                self.mimetype
            )));
        }
        self.validate_size(max_bytes)
    }

    pub fn validate_size(&self, max_bytes: usize) -> Result<(), StorageError> {
        if self.data.is_empty() {
            return Err(StorageError::InvalidImage("Uploaded file is empty".to_string()));
        }
        if self.data.len() > max_bytes {
            return Err(StorageError::TooLarge { max_bytes });
        }
        Ok(())
    }
}

/// Stored attachment without its bytes
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImageMeta {
    pub image_id: Uuid,
    #[serde(skip_serializing)]
    pub org_id: Option<Uuid>,
    pub kind: String,
    pub ref_id: Option<String>,
    pub filename: String,
    pub mimetype: String,
    pub size: i64,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

impl ImageMeta {
    /// Public download path
    pub fn url(&self) -> String {
        image_url(self.image_id, &self.filename)
    }
}

#[derive(Debug, Clone)]
pub struct StoredImage {
    pub meta: ImageMeta,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, image: NewImage) -> Result<ImageMeta, StorageError>;

    async fn get(&self, image_id: Uuid) -> Result<StoredImage, StorageError>;

    /// Newest attachment of `kind` owned by `ref_id`
    async fn get_by_ref(&self, kind: ImageKind, ref_id: &str) -> Result<StoredImage, StorageError>;

    /// Every attachment of `kind` owned by `ref_id`, newest first
    async fn list_by_ref(&self, kind: ImageKind, ref_id: &str) -> Result<Vec<ImageMeta>, StorageError>;

    /// Delete one image belonging to `org_id`
    async fn delete(&self, org_id: Uuid, image_id: Uuid) -> Result<(), StorageError>;

    /// Delete every attachment of `kind` owned by `ref_id`; returns how many went
    async fn delete_by_ref(&self, org_id: Uuid, kind: ImageKind, ref_id: &str) -> Result<u64, StorageError>;
}

/// Store `uploads` while the caller's transaction is still open, then run
/// `commit`. A failed put removes the images already stored and `commit`
/// never runs, so dropping the transaction rolls the row back. A failed
/// commit removes every stored image.
pub async fn put_before_commit<E, F>(
    images: &dyn ImageStore,
    uploads: Vec<NewImage>,
    commit: F,
) -> Result<Vec<ImageMeta>, E>
where
    E: From<StorageError>,
    F: Future<Output = Result<(), E>>,
{
    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match images.put(upload).await {
            Ok(meta) => stored.push(meta),
            Err(err) => {
                discard(images, &stored).await;
                return Err(err.into());
            }
        }
    }

    if let Err(err) = commit.await {
        discard(images, &stored).await;
        return Err(err);
    }
    Ok(stored)
}

async fn discard(images: &dyn ImageStore, stored: &[ImageMeta]) {
    for meta in stored {
        let Some(org_id) = meta.org_id else {
            continue;
        };
        if let Err(err) = images.delete(org_id, meta.image_id).await {
            tracing::warn!("Could not remove image {} after a failed write: {}", meta.image_id, err);
        }
    }
}

pub fn image_url(image_id: Uuid, filename: &str) -> String {
    format!("/upload/image/{}/{}", image_id, filename)
}

/// Hex SHA-256 of `data`, served as the ETag
pub fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Split a `data:<mime>;base64,<payload>` URL into its mimetype and bytes
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), StorageError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| StorageError::InvalidImage("Expected a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| StorageError::InvalidImage("Malformed data URL".to_string()))?;
    let mimetype = header
        .strip_suffix(";base64")
        .ok_or_else(|| StorageError::InvalidImage("Data URL must be base64 encoded".to_string()))?;

    let data = BASE64
        .decode(payload.trim())
        .map_err(|e| StorageError::InvalidImage(format!("Invalid base64 payload: {}", e)))?;
    Ok((mimetype.to_string(), data))
}

/// File extension for common image mimetypes
pub fn extension_for(mimetype: &str) -> &'static str {
    match mimetype {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

/// Keep only characters that are safe in a URL path segment
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if cleaned.trim_matches(|c: char| c == '.' || c == '_').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(mimetype: &str, size: usize) -> NewImage {
        NewImage {
            org_id: None,
            kind: ImageKind::ItemImage,
            ref_id: None,
            filename: "a.png".to_string(),
            mimetype: mimetype.to_string(),
            data: vec![1; size],
            uploaded_by: None,
        }
    }

    #[test]
    fn test_checksum_is_sha256_hex() {
        assert_eq!(
            checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_decode_data_url() {
        let (mime, data) = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(data, b"hello");

        assert!(decode_data_url("https://example.com/a.png").is_err());
        assert!(decode_data_url("data:image/png,plain").is_err());
        assert!(decode_data_url("data:image/png;base64,!!!").is_err());
    }

    #[test]
    fn test_from_data_url() {
        let org = Uuid::new_v4();
        let image = NewImage::from_data_url(
            "data:image/jpeg;base64,aGVsbG8=",
            ImageKind::UserPicture,
            org,
            Uuid::new_v4(),
            "user-42",
        )
        .unwrap()
        .owned_by("42");
        assert_eq!(image.filename, "user-42.jpg");
        assert_eq!(image.mimetype, "image/jpeg");
        assert_eq!(image.org_id, Some(org));
        assert_eq!(image.ref_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_validate_image() {
        assert!(image("image/png", 10).validate_image(100).is_ok());
        assert!(matches!(
            image("application/pdf", 10).validate_image(100),
            Err(StorageError::InvalidImage(_))
        ));
        assert!(matches!(
            image("image/png", 101).validate_image(100),
            Err(StorageError::TooLarge { max_bytes: 100 })
        ));
        assert!(image("image/png", 0).validate_image(100).is_err());
        assert!(image("application/pdf", 10).validate_size(100).is_ok());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(image_url(Uuid::nil(), "a.png"), "/upload/image/00000000-0000-0000-0000-000000000000/a.png");
    }

    use memory::MemoryStore;

    fn owned_upload() -> NewImage {
        NewImage { org_id: Some(Uuid::new_v4()), ..image("image/png", 4) }.owned_by("item-1")
    }

    #[tokio::test]
    async fn test_put_before_commit_stores_then_commits() {
        let store = MemoryStore::default();
        let committed = std::sync::atomic::AtomicBool::new(false);
        let stored = put_before_commit::<StorageError, _>(&store, vec![owned_upload(), owned_upload()], async {
            committed.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(store.held(), 2);
        assert!(committed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_put_skips_commit_and_removes_earlier_images() {
        let store = MemoryStore { fail_after: Some(1), ..Default::default() };
        let committed = std::sync::atomic::AtomicBool::new(false);
        let result = put_before_commit::<StorageError, _>(&store, vec![owned_upload(), owned_upload()], async {
            committed.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(StorageError::InvalidImage(_))));
        assert!(!committed.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(store.held(), 0);
    }

    #[tokio::test]
    async fn test_failed_commit_removes_stored_images() {
        let store = MemoryStore::default();
        let result = put_before_commit(&store, vec![owned_upload()], async { Err(StorageError::NotFound) }).await;

        assert!(matches!(result, Err(StorageError::NotFound)));
        assert_eq!(store.held(), 0);
    }
}
