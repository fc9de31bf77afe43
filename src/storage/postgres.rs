use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::{checksum, ImageKind, ImageMeta, ImageStore, NewImage, StorageError, StoredImage};
use crate::database::DatabaseManager;

const META_COLUMNS: &str = "image_id, org_id, kind, ref_id, filename, mimetype, size, checksum, created_at";

/// Images kept in the `images` table. The pool is resolved per call so the
/// store can be built before the database is reachable.
#[derive(Debug, Default, Clone)]
pub struct PgImageStore;

impl PgImageStore {
    pub fn new() -> Self {
        Self
    }

    async fn pool(&self) -> Result<PgPool, StorageError> {
        Ok(DatabaseManager::main_pool().await?)
    }
}

fn stored_from_row(row: PgRow) -> Result<StoredImage, sqlx::Error> {
    let meta = ImageMeta {
        image_id: row.try_get("image_id")?,
        org_id: row.try_get("org_id")?,
        kind: row.try_get("kind")?,
        ref_id: row.try_get("ref_id")?,
        filename: row.try_get("filename")?,
        mimetype: row.try_get("mimetype")?,
        size: row.try_get("size")?,
        checksum: row.try_get("checksum")?,
        created_at: row.try_get("created_at")?,
    };
    Ok(StoredImage { meta, data: row.try_get("data")? })
}

#[async_trait]
impl ImageStore for PgImageStore {
    async fn put(&self, image: NewImage) -> Result<ImageMeta, StorageError> {
        let pool = self.pool().await?;
        let sum = checksum(&image.data);

        let meta = sqlx::query_as::<_, ImageMeta>(&format!(
            r#"
            INSERT INTO images (org_id, kind, ref_id, filename, mimetype, size, checksum, data, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            META_COLUMNS
        ))
        .bind(image.org_id)
        .bind(image.kind.as_str())
        .bind(&image.ref_id)
        .bind(&image.filename)
        .bind(&image.mimetype)
        .bind(image.data.len() as i64)
        .bind(&sum)
        .bind(&image.data)
        .bind(image.uploaded_by)
        .fetch_one(&pool)
        .await?;

        tracing::info!("Stored {} image {} ({} bytes)", meta.kind, meta.image_id, meta.size);
        Ok(meta)
    }

    async fn get(&self, image_id: Uuid) -> Result<StoredImage, StorageError> {
        let pool = self.pool().await?;
        let row = sqlx::query(&format!("SELECT {}, data FROM images WHERE image_id = $1", META_COLUMNS))
            .bind(image_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(StorageError::NotFound)?;
        Ok(stored_from_row(row)?)
    }

    async fn get_by_ref(&self, kind: ImageKind, ref_id: &str) -> Result<StoredImage, StorageError> {
        let pool = self.pool().await?;
        let row = sqlx::query(&format!(
            "SELECT {}, data FROM images WHERE kind = $1 AND ref_id = $2 ORDER BY created_at DESC LIMIT 1",
            META_COLUMNS
        ))
        .bind(kind.as_str())
        .bind(ref_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(StorageError::NotFound)?;
        Ok(stored_from_row(row)?)
    }

    async fn list_by_ref(&self, kind: ImageKind, ref_id: &str) -> Result<Vec<ImageMeta>, StorageError> {
        let pool = self.pool().await?;
        let images = sqlx::query_as::<_, ImageMeta>(&format!(
            "SELECT {} FROM images WHERE kind = $1 AND ref_id = $2 ORDER BY created_at DESC",
            META_COLUMNS
        ))
        .bind(kind.as_str())
        .bind(ref_id)
        .fetch_all(&pool)
        .await?;
        Ok(images)
    }

    async fn delete(&self, org_id: Uuid, image_id: Uuid) -> Result<(), StorageError> {
        let pool = self.pool().await?;
        let result = sqlx::query("DELETE FROM images WHERE image_id = $1 AND org_id = $2")
            .bind(image_id)
            .bind(org_id)
            .execute(&pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_by_ref(&self, org_id: Uuid, kind: ImageKind, ref_id: &str) -> Result<u64, StorageError> {
        let pool = self.pool().await?;
        let result = sqlx::query("DELETE FROM images WHERE org_id = $1 AND kind = $2 AND ref_id = $3")
            .bind(org_id)
            .bind(kind.as_str())
            .bind(ref_id)
            .execute(&pool)
            .await?;
        Ok(result.rows_affected())
    }
}
