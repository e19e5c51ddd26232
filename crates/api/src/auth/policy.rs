//! Authorization policy
//!
//! Every role/ownership decision in the API lives here as a pure function
//! over the caller's role and the project's access view. Handlers consult
//! these instead of re-deriving role logic locally.
//!
//! Lead-derived permissions are checked before assignment membership, so a
//! lead who also appears in the assigned set (not prevented, but not
//! expected) keeps full lead permissions.

use uuid::Uuid;

use crate::db::projects::ProjectStatus;
use crate::db::users::Role;

/// The slice of a project the policy needs to decide access.
#[derive(Debug, Clone)]
pub struct ProjectAccess {
    pub lead: Uuid,
    pub status: ProjectStatus,
    pub developer_ids: Vec<Uuid>,
}

impl ProjectAccess {
    fn is_lead(&self, user_id: Uuid) -> bool {
        self.lead == user_id
    }

    fn is_assigned(&self, user_id: Uuid) -> bool {
        self.developer_ids.contains(&user_id)
    }
}

/// View a single project: admin, the lead, an assigned developer, or anyone
/// while the project is active (open read policy for active projects).
pub fn can_view_project(role: Role, user_id: Uuid, project: &ProjectAccess) -> bool {
    role == Role::Admin
        || project.is_lead(user_id)
        || project.is_assigned(user_id)
        || project.status == ProjectStatus::Active
}

/// Create a project: admin only.
pub fn can_create_project(role: Role) -> bool {
    role == Role::Admin
}

/// Mark a project completed: admin only.
pub fn can_complete_project(role: Role) -> bool {
    role == Role::Admin
}

/// Assign developers: admin, or a project_lead leading this project.
pub fn can_assign_developers(role: Role, user_id: Uuid, project: &ProjectAccess) -> bool {
    match role {
        Role::Admin => true,
        Role::ProjectLead => project.is_lead(user_id),
        Role::Developer => false,
    }
}

/// Upload a document: admin, or a project_lead leading this project.
/// Developers may never upload, assigned or not.
pub fn can_upload_document(role: Role, user_id: Uuid, project: &ProjectAccess) -> bool {
    match role {
        Role::Admin => true,
        Role::ProjectLead => project.is_lead(user_id),
        Role::Developer => false,
    }
}

/// View or download a project's documents: admin, the lead, or an assigned
/// developer.
pub fn can_view_documents(role: Role, user_id: Uuid, project: &ProjectAccess) -> bool {
    role == Role::Admin || project.is_lead(user_id) || project.is_assigned(user_id)
}

/// Register users or change another user's role: admin only. Nobody changes
/// their own role.
pub fn can_manage_users(role: Role) -> bool {
    role == Role::Admin
}
