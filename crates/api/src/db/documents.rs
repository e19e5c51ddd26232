//! Document metadata queries
//!
//! File bytes live on disk; only metadata and ownership references are
//! stored here.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiResult;

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub original_name: String,
    #[serde(skip)]
    pub path: String,
    pub mime_type: String,
    pub size: i64,
    pub project_id: Uuid,
    pub uploader: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A document joined with its uploader's username for listing.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListing {
    pub id: Uuid,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub uploader_username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const DOCUMENT_COLUMNS: &str =
    "id, filename, original_name, path, mime_type, size, project_id, uploader, created_at";

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    pool: &PgPool,
    filename: &str,
    original_name: &str,
    path: &str,
    mime_type: &str,
    size: i64,
    project_id: Uuid,
    uploader: Uuid,
) -> ApiResult<Document> {
    let document = sqlx::query_as::<_, Document>(&format!(
        "INSERT INTO documents (filename, original_name, path, mime_type, size, project_id, uploader) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {DOCUMENT_COLUMNS}"
    ))
    .bind(filename)
    .bind(original_name)
    .bind(path)
    .bind(mime_type)
    .bind(size)
    .bind(project_id)
    .bind(uploader)
    .fetch_one(pool)
    .await?;

    Ok(document)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> ApiResult<Option<Document>> {
    let document = sqlx::query_as::<_, Document>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(document)
}

pub async fn list_for_project(pool: &PgPool, project_id: Uuid) -> ApiResult<Vec<DocumentListing>> {
    let documents = sqlx::query_as::<_, DocumentListing>(
        "SELECT d.id, d.original_name, d.mime_type, d.size, u.username AS uploader_username, \
                d.created_at \
         FROM documents d \
         JOIN users u ON u.id = d.uploader \
         WHERE d.project_id = $1 \
         ORDER BY d.created_at DESC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(documents)
}
