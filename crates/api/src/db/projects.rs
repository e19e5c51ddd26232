//! Project store queries

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::policy::ProjectAccess;
use crate::error::ApiResult;

use super::users::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Completed,
}

/// A user reference embedded in project responses.
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub id: Uuid,
    pub username: String,
}

/// A project with its lead and assigned team resolved to usernames.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    pub status: ProjectStatus,
    pub lead: Member,
    pub assigned_developers: Vec<Member>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    description: String,
    deadline: OffsetDateTime,
    status: ProjectStatus,
    lead_id: Uuid,
    lead_username: String,
    created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    project_id: Uuid,
    user_id: Uuid,
    username: String,
}

const PROJECT_COLUMNS: &str = "p.id, p.name, p.description, p.deadline, p.status, p.created_at, \
     u.id AS lead_id, u.username AS lead_username";

impl ProjectRow {
    fn into_project(self, developers: Vec<Member>) -> Project {
        Project {
            id: self.id,
            name: self.name,
            description: self.description,
            deadline: self.deadline,
            status: self.status,
            lead: Member {
                id: self.lead_id,
                username: self.lead_username,
            },
            assigned_developers: developers,
            created_at: self.created_at,
        }
    }
}

/// Resolve assigned developers for a batch of projects in one query.
async fn assignments_for(
    pool: &PgPool,
    project_ids: &[Uuid],
) -> ApiResult<HashMap<Uuid, Vec<Member>>> {
    let rows = sqlx::query_as::<_, AssignmentRow>(
        "SELECT pd.project_id, u.id AS user_id, u.username \
         FROM project_developers pd \
         JOIN users u ON u.id = pd.user_id \
         WHERE pd.project_id = ANY($1) \
         ORDER BY u.username ASC",
    )
    .bind(project_ids)
    .fetch_all(pool)
    .await?;

    let mut by_project: HashMap<Uuid, Vec<Member>> = HashMap::new();
    for row in rows {
        by_project.entry(row.project_id).or_default().push(Member {
            id: row.user_id,
            username: row.username,
        });
    }

    Ok(by_project)
}

async fn resolve_rows(pool: &PgPool, rows: Vec<ProjectRow>) -> ApiResult<Vec<Project>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut assignments = assignments_for(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let developers = assignments.remove(&row.id).unwrap_or_default();
            row.into_project(developers)
        })
        .collect())
}

/// Active projects, newest first.
pub async fn list_active(pool: &PgPool) -> ApiResult<Vec<Project>> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects p \
         JOIN users u ON u.id = p.lead \
         WHERE p.status = 'active' \
         ORDER BY p.created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    resolve_rows(pool, rows).await
}

/// Projects the given user is assigned to, any status, newest first.
pub async fn list_assigned_to(pool: &PgPool, user_id: Uuid) -> ApiResult<Vec<Project>> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects p \
         JOIN users u ON u.id = p.lead \
         JOIN project_developers pd ON pd.project_id = p.id \
         WHERE pd.user_id = $1 \
         ORDER BY p.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    resolve_rows(pool, rows).await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> ApiResult<Option<Project>> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects p \
         JOIN users u ON u.id = p.lead \
         WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };
    let mut projects = resolve_rows(pool, vec![row]).await?;
    Ok(projects.pop())
}

/// The minimal view the authorization policy needs: lead, status, and the
/// assigned-developer set.
pub async fn fetch_access(pool: &PgPool, id: Uuid) -> ApiResult<Option<ProjectAccess>> {
    let head: Option<(Uuid, ProjectStatus)> =
        sqlx::query_as("SELECT lead, status FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    let Some((lead, status)) = head else {
        return Ok(None);
    };

    let developer_ids: Vec<Uuid> =
        sqlx::query_scalar("SELECT user_id FROM project_developers WHERE project_id = $1")
            .bind(id)
            .fetch_all(pool)
            .await?;

    Ok(Some(ProjectAccess {
        lead,
        status,
        developer_ids,
    }))
}

pub async fn insert(
    pool: &PgPool,
    name: &str,
    description: &str,
    deadline: OffsetDateTime,
    lead: Uuid,
) -> ApiResult<Project> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO projects (name, description, deadline, lead) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(description)
    .bind(deadline)
    .bind(lead)
    .fetch_one(pool)
    .await?;

    let project = find_by_id(pool, id).await?;
    project.ok_or_else(|| sqlx::Error::RowNotFound.into())
}

pub async fn set_completed(pool: &PgPool, id: Uuid) -> ApiResult<Option<Project>> {
    let updated = sqlx::query(
        "UPDATE projects SET status = 'completed', updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Ok(None);
    }

    find_by_id(pool, id).await
}

/// Replace the assigned-developer set atomically.
pub async fn replace_developers(
    pool: &PgPool,
    project_id: Uuid,
    developer_ids: &[Uuid],
) -> ApiResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM project_developers WHERE project_id = $1")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO project_developers (project_id, user_id) \
         SELECT $1, unnest($2::uuid[])",
    )
    .bind(project_id)
    .bind(developer_ids)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(())
}

/// Count how many of the given ids are users holding the developer role.
/// Used to validate assignment requests before writing anything.
pub async fn count_developers(pool: &PgPool, ids: &[Uuid]) -> ApiResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ANY($1) AND role = $2")
            .bind(ids)
            .bind(Role::Developer)
            .fetch_one(pool)
            .await?;

    Ok(count)
}
