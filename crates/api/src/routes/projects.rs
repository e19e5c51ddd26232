//! Project endpoints
//!
//! All routes require an authenticated session; per-action role and
//! ownership rules come from `auth::policy`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::middleware::{require_auth, AuthState, AuthUser};
use crate::auth::policy::{self, ProjectAccess};
use crate::db::projects::{self, Project};
use crate::db::users::{self, Role};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router(state: AppState, auth_state: AuthState) -> Router {
    Router::new()
        .route("/", get(list_active).post(create))
        .route("/my-assignments", get(my_assignments))
        .route("/{id}", get(get_one))
        .route("/{id}/complete", patch(complete))
        .route("/{id}/assign", post(assign))
        .layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state)
}

fn access_of(project: &Project) -> ProjectAccess {
    ProjectAccess {
        lead: project.lead.id,
        status: project.status,
        developer_ids: project
            .assigned_developers
            .iter()
            .map(|member| member.id)
            .collect(),
    }
}

/// GET /api/projects — active projects, visible to every authenticated user.
async fn list_active(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    let projects = projects::list_active(&state.pool).await?;
    Ok(Json(projects))
}

/// GET /api/projects/my-assignments — projects the caller is assigned to,
/// any status.
async fn my_assignments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = projects::list_assigned_to(&state.pool, user.id).await?;
    Ok(Json(projects))
}

/// GET /api/projects/{id}
async fn get_one(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    let project = projects::find_by_id(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("Project"))?;

    if !policy::can_view_project(user.role, user.id, &access_of(&project)) {
        return Err(ApiError::Authorization(
            "Not authorized to view this project".to_string(),
        ));
    }

    Ok(Json(project))
}

#[derive(Debug, Deserialize)]
struct CreateProjectRequest {
    name: String,
    description: String,
    #[serde(with = "time::serde::rfc3339")]
    deadline: OffsetDateTime,
    lead: Uuid,
}

/// POST /api/projects (admin only)
async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    if !policy::can_create_project(user.role) {
        return Err(ApiError::Authorization(
            "Not authorized for this action".to_string(),
        ));
    }

    let name = body.name.trim();
    let description = body.description.trim();
    if name.is_empty() || description.is_empty() {
        return Err(ApiError::Validation(
            "Missing required fields: name, description, deadline, lead".to_string(),
        ));
    }
    if name.len() > 100 {
        return Err(ApiError::Validation(
            "Name must be at most 100 characters".to_string(),
        ));
    }
    if description.len() > 1000 {
        return Err(ApiError::Validation(
            "Description must be at most 1000 characters".to_string(),
        ));
    }
    if body.deadline <= OffsetDateTime::now_utc() {
        return Err(ApiError::Validation(
            "Deadline must be in the future".to_string(),
        ));
    }

    // The lead must exist and actually be able to lead.
    let lead = users::find_by_id(&state.pool, body.lead)
        .await?
        .ok_or(ApiError::NotFound("Lead user"))?;
    if lead.role == Role::Developer {
        return Err(ApiError::Validation(
            "Lead must be a project lead or admin".to_string(),
        ));
    }

    let project =
        projects::insert(&state.pool, name, description, body.deadline, lead.id).await?;

    tracing::info!(project_id = %project.id, lead = %lead.id, "project created");

    Ok((StatusCode::CREATED, Json(project)))
}

/// PATCH /api/projects/{id}/complete (admin only)
async fn complete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    if !policy::can_complete_project(user.role) {
        return Err(ApiError::Authorization(
            "Not authorized for this action".to_string(),
        ));
    }

    let project = projects::set_completed(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("Project"))?;

    tracing::info!(project_id = %id, "project marked completed");

    Ok(Json(project))
}

#[derive(Debug, Deserialize)]
struct AssignRequest {
    #[serde(rename = "developerIds")]
    developer_ids: Vec<Uuid>,
}

/// POST /api/projects/{id}/assign (admin, or this project's lead)
async fn assign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignRequest>,
) -> ApiResult<Json<Project>> {
    let access = projects::fetch_access(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("Project"))?;

    if !policy::can_assign_developers(user.role, user.id, &access) {
        return Err(ApiError::Authorization(
            "Not authorized to manage this project".to_string(),
        ));
    }

    // Dedupe while keeping the caller's ordering.
    let mut developer_ids: Vec<Uuid> = Vec::with_capacity(body.developer_ids.len());
    for candidate in body.developer_ids {
        if !developer_ids.contains(&candidate) {
            developer_ids.push(candidate);
        }
    }

    // Every id must reference a user holding the developer role.
    let valid = projects::count_developers(&state.pool, &developer_ids).await?;
    if valid != developer_ids.len() as i64 {
        return Err(ApiError::Validation(
            "One or more developer IDs are invalid".to_string(),
        ));
    }

    projects::replace_developers(&state.pool, id, &developer_ids).await?;

    tracing::info!(
        project_id = %id,
        assigned = developer_ids.len(),
        "developer assignments replaced"
    );

    let project = projects::find_by_id(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound("Project"))?;

    Ok(Json(project))
}
