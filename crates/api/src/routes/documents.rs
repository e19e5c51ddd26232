//! Document endpoints
//!
//! Upload is restricted to admins and the owning project's lead; viewing
//! and downloading require project membership. File bytes land under the
//! configured upload directory with server-generated names; the store keeps
//! metadata only.

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use uuid::Uuid;

use crate::auth::middleware::{require_auth, AuthState, AuthUser};
use crate::auth::policy;
use crate::db::{documents, projects};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Upload size cap, matching the JSON body limit elsewhere.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn router(state: AppState, auth_state: AuthState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/project/{projectId}", get(list_for_project))
        .route("/{id}/download", get(download))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state)
}

/// Keep the original name readable but safe for the filesystem.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

struct UploadedFile {
    original_name: String,
    mime_type: String,
    data: Vec<u8>,
}

/// POST /api/documents/upload (admin, or the project's lead)
async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut project_id: Option<Uuid> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("projectId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                let id = Uuid::parse_str(text.trim())
                    .map_err(|_| ApiError::Validation("Invalid project id".to_string()))?;
                project_id = Some(id);
            }
            Some("file") => {
                let original_name = field
                    .file_name()
                    .map(sanitize_filename)
                    .unwrap_or_else(|| "upload".to_string());
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?
                    .to_vec();
                file = Some(UploadedFile {
                    original_name,
                    mime_type,
                    data,
                });
            }
            _ => {}
        }
    }

    let project_id =
        project_id.ok_or_else(|| ApiError::Validation("projectId is required".to_string()))?;
    let file = file.ok_or_else(|| ApiError::Validation("No file uploaded".to_string()))?;

    let access = projects::fetch_access(&state.pool, project_id)
        .await?
        .ok_or(ApiError::NotFound("Project"))?;

    // Authorization happens before anything touches the disk.
    if !policy::can_upload_document(user.role, user.id, &access) {
        return Err(ApiError::Authorization(
            "Not authorized to upload documents".to_string(),
        ));
    }

    let filename = format!("{}-{}", Uuid::new_v4(), file.original_name);
    let dir = state.config.upload_dir.clone();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(ApiError::internal)?;

    let path = dir.join(&filename);
    tokio::fs::write(&path, &file.data)
        .await
        .map_err(ApiError::internal)?;

    let document = documents::insert(
        &state.pool,
        &filename,
        &file.original_name,
        &path.to_string_lossy(),
        &file.mime_type,
        file.data.len() as i64,
        project_id,
        user.id,
    )
    .await?;

    tracing::info!(
        document_id = %document.id,
        project_id = %project_id,
        uploader = %user.id,
        size = document.size,
        "document uploaded"
    );

    Ok((StatusCode::CREATED, Json(document)).into_response())
}

/// GET /api/documents/project/{projectId}
async fn list_for_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<documents::DocumentListing>>> {
    let access = projects::fetch_access(&state.pool, project_id)
        .await?
        .ok_or(ApiError::NotFound("Project"))?;

    if !policy::can_view_documents(user.role, user.id, &access) {
        return Err(ApiError::Authorization(
            "Not authorized to view documents".to_string(),
        ));
    }

    let listings = documents::list_for_project(&state.pool, project_id).await?;
    Ok(Json(listings))
}

/// GET /api/documents/{id}/download
async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let document = documents::find_by_id(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("Document"))?;

    let access = projects::fetch_access(&state.pool, document.project_id)
        .await?
        .ok_or(ApiError::NotFound("Project"))?;

    if !policy::can_view_documents(user.role, user.id, &access) {
        return Err(ApiError::Authorization(
            "Not authorized".to_string(),
        ));
    }

    let bytes = tokio::fs::read(&document.path).await.map_err(|err| {
        tracing::error!(document_id = %id, path = %document.path, error = ?err, "stored file missing");
        ApiError::NotFound("Document")
    })?;

    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&document.mime_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        document.original_name
    )) {
        headers.insert(CONTENT_DISPOSITION, value);
    }

    Ok(response)
}
