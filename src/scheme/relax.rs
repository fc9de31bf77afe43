//! Free-form JSON documents and file attachments hung off a model record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::{parse_key, SchemeError};
use crate::config::CONFIG;
use crate::database::DynamicRepository;
use crate::storage::{put_before_commit, ImageKind, ImageMeta, ImageStore, NewImage, UploadedFile};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub model: String,
    pub record_id: String,
    pub body: Value,
    pub rev: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Attachment {
    #[serde(flatten)]
    pub meta: ImageMeta,
    pub url: String,
}

impl From<ImageMeta> for Attachment {
    fn from(meta: ImageMeta) -> Self {
        let url = meta.url();
        Self { meta, url }
    }
}

#[derive(Debug, Serialize)]
pub struct RelaxDocument {
    #[serde(flatten)]
    pub document: Document,
    pub attachments: Vec<Attachment>,
}

/// Attachments of one record share this owner reference
pub fn attachment_ref(model: &str, key: &str) -> String {
    format!("{}:{}", model, key)
}

pub async fn read(
    repo: &DynamicRepository<'_>,
    images: &dyn ImageStore,
    org_id: Uuid,
    id: &str,
) -> Result<RelaxDocument, SchemeError> {
    let schema = repo.schema();
    let key = parse_key(schema, id)?;
    let pool = crate::database::DatabaseManager::main_pool().await?;

    let document = sqlx::query_as::<_, Document>(
        "SELECT model, record_id, body, rev, updated_at FROM documents WHERE org_id = $1 AND model = $2 AND record_id = $3",
    )
    .bind(org_id)
    .bind(schema.name)
    .bind(&key)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| SchemeError::NotFound(format!("No document for {} '{}'", schema.name, key)))?;

    let attachments = attachments_of(images, org_id, &attachment_ref(schema.name, &key)).await?;
    Ok(RelaxDocument { document, attachments })
}

/// Store `body` (when given) as the record's document, bumping its revision,
/// and keep every file as an attachment of the record. The revision only
/// commits once every file is stored. Returns the full attachment list.
pub async fn upsert(
    repo: &DynamicRepository<'_>,
    images: &dyn ImageStore,
    org_id: Uuid,
    user_id: Uuid,
    id: &str,
    body: Option<Value>,
    files: Vec<UploadedFile>,
) -> Result<RelaxDocument, SchemeError> {
    let schema = repo.schema();
    let key = parse_key(schema, id)?;
    if let Some(body) = &body {
        if !body.is_object() {
            return Err(SchemeError::BadRequest("'body' must be a JSON object".to_string()));
        }
    }

    if repo.select_by_key(&key).await?.is_none() {
        return Err(SchemeError::NotFound(format!("{} '{}' not found", schema.name, key)));
    }

    let owner = attachment_ref(schema.name, &key);
    let uploads: Vec<NewImage> = files
        .into_iter()
        .map(|file| NewImage::from_upload(file, ImageKind::Attachment, org_id, user_id).owned_by(owner.clone()))
        .collect();
    for upload in &uploads {
        upload.validate_size(CONFIG.uploads.max_image_bytes)?;
    }

    let pool = crate::database::DatabaseManager::main_pool().await?;
    let mut tx = pool.begin().await?;
    let document = sqlx::query_as::<_, Document>(
        r#"
        INSERT INTO documents (org_id, model, record_id, body)
        VALUES ($1, $2, $3, COALESCE($4, '{}'::jsonb))
        ON CONFLICT (org_id, model, record_id) DO UPDATE
        SET body = COALESCE($4, documents.body),
            rev = documents.rev + 1,
            updated_at = now()
        RETURNING model, record_id, body, rev, updated_at
        "#,
    )
    .bind(org_id)
    .bind(schema.name)
    .bind(&key)
    .bind(body)
    .fetch_one(&mut *tx)
    .await?;

    let added = put_before_commit(images, uploads, async move {
        tx.commit().await.map_err(SchemeError::from)
    })
    .await?;

    tracing::info!(
        "Document {}:{} at rev {} with {} new attachment(s)",
        schema.name,
        key,
        document.rev,
        added.len()
    );
    let attachments = attachments_of(images, org_id, &owner).await?;
    Ok(RelaxDocument { document, attachments })
}

async fn attachments_of(images: &dyn ImageStore, org_id: Uuid, owner: &str) -> Result<Vec<Attachment>, SchemeError> {
    Ok(images
        .list_by_ref(ImageKind::Attachment, owner)
        .await?
        .into_iter()
        .filter(|meta| meta.org_id == Some(org_id))
        .map(Attachment::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_ref() {
        assert_eq!(attachment_ref("item", "abc"), "item:abc");
    }

    #[test]
    fn test_attachment_serializes_flat() {
        let meta = ImageMeta {
            image_id: Uuid::nil(),
            org_id: Some(Uuid::nil()),
            kind: "attachment".to_string(),
            ref_id: Some("item:abc".to_string()),
            filename: "manual.pdf".to_string(),
            mimetype: "application/pdf".to_string(),
            size: 12,
            checksum: "00".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(Attachment::from(meta)).unwrap();
        assert_eq!(json["filename"], "manual.pdf");
        assert_eq!(json["url"], "/upload/image/00000000-0000-0000-0000-000000000000/manual.pdf");
        assert!(json.get("orgId").is_none());
    }

    #[tokio::test]
    async fn test_attachments_of_lists_every_file_of_the_record_in_org() {
        use crate::storage::memory::MemoryStore;

        let store = MemoryStore::default();
        let (ours, theirs) = (Uuid::new_v4(), Uuid::new_v4());
        let file = |org_id: Uuid, filename: &str, owner: &str| NewImage {
            org_id: Some(org_id),
            kind: ImageKind::Attachment,
            ref_id: None,
            filename: filename.to_string(),
            mimetype: "application/pdf".to_string(),
            data: vec![7; 3],
            uploaded_by: None,
        }
        .owned_by(owner);

        store.put(file(ours, "manual.pdf", "item:abc")).await.unwrap();
        store.put(file(ours, "receipt.pdf", "item:abc")).await.unwrap();
        store.put(file(theirs, "other.pdf", "item:abc")).await.unwrap();
        store.put(file(ours, "unrelated.pdf", "item:xyz")).await.unwrap();

        let listed = attachments_of(&store, ours, "item:abc").await.unwrap();
        let mut names: Vec<&str> = listed.iter().map(|a| a.meta.filename.as_str()).collect();
        names.sort();
        assert_eq!(names, ["manual.pdf", "receipt.pdf"]);
    }
}
