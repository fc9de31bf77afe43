//! In-memory `ImageStore` for unit tests.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use uuid::Uuid;

use super::{checksum, ImageKind, ImageMeta, ImageStore, NewImage, StorageError, StoredImage};

/// In-memory store whose `put` fails once `fail_after` images are held
#[derive(Default)]
pub struct MemoryStore {
    pub held: Mutex<Vec<ImageMeta>>,
    pub fail_after: Option<usize>,
}

impl MemoryStore {
    pub fn held(&self) -> usize {
        self.held.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn put(&self, image: NewImage) -> Result<ImageMeta, StorageError> {
        let mut held = self.held.lock().unwrap();
        if self.fail_after.is_some_and(|n| held.len() >= n) {
            return Err(StorageError::InvalidImage("disk full".to_string()));
        }
        let meta = ImageMeta {
            image_id: Uuid::new_v4(),
            org_id: image.org_id,
            kind: image.kind.as_str().to_string(),
            ref_id: image.ref_id,
            filename: image.filename,
            mimetype: image.mimetype,
            size: image.data.len() as i64,
            checksum: checksum(&image.data),
            created_at: Utc::now(),
        };
        held.push(meta.clone());
        Ok(meta)
    }

    async fn get(&self, _image_id: Uuid) -> Result<StoredImage, StorageError> {
        Err(StorageError::NotFound)
    }

    async fn get_by_ref(&self, _kind: ImageKind, _ref_id: &str) -> Result<StoredImage, StorageError> {
        Err(StorageError::NotFound)
    }

    async fn list_by_ref(&self, _kind: ImageKind, ref_id: &str) -> Result<Vec<ImageMeta>, StorageError> {
        let held = self.held.lock().unwrap();
        Ok(held.iter().filter(|m| m.ref_id.as_deref() == Some(ref_id)).cloned().collect())
    }

    async fn delete(&self, _org_id: Uuid, image_id: Uuid) -> Result<(), StorageError> {
        self.held.lock().unwrap().retain(|m| m.image_id != image_id);
        Ok(())
    }

    async fn delete_by_ref(&self, _org_id: Uuid, _kind: ImageKind, ref_id: &str) -> Result<u64, StorageError> {
        let mut held = self.held.lock().unwrap();
        let before = held.len();
        held.retain(|m| m.ref_id.as_deref() != Some(ref_id));
        Ok((before - held.len()) as u64)
    }
}
