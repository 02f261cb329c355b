/// Project-scoped authorization
///
/// Every project route runs [`authorize`] with the set of roles it admits.
/// The check resolves the caller's membership in the addressed project and
/// yields a [`ProjectAccess`] carrying the parsed project id and the role the
/// caller holds there.
///
/// Non-members get `NotMember` whether or not the project exists, so project
/// ids of other teams cannot be probed.
///
/// # Example
///
/// ```no_run
/// use taskmanager_shared::auth::authorization::authorize;
/// use taskmanager_shared::models::membership::ProjectRole;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let access = authorize(&pool, user_id, "8c4f…", ProjectRole::TASK_MANAGERS).await?;
/// println!("acting as {} in {}", access.role, access.project_id);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::membership::{ProjectMember, ProjectRole};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Project id is missing")]
    MissingProjectId,

    #[error("Invalid project id")]
    InvalidProjectId,

    /// Caller has no membership in the project (or the project does not exist)
    #[error("Project not found")]
    NotMember,

    /// Caller is a member but their role is not admitted
    #[error("You dont have permission to perform this action")]
    InsufficientRole { actual: ProjectRole },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Outcome of a successful authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectAccess {
    pub project_id: Uuid,
    pub role: ProjectRole,
}

/// Parses a project id from a path segment
pub fn parse_project_id(raw: &str) -> Result<Uuid, AuthzError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AuthzError::MissingProjectId);
    }

    Uuid::parse_str(raw).map_err(|_| AuthzError::InvalidProjectId)
}

/// Checks that `role` is one of `allowed`
pub fn check_role(role: ProjectRole, allowed: &[ProjectRole]) -> Result<(), AuthzError> {
    if role.is_in(allowed) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole { actual: role })
    }
}

/// Authorizes `user_id` against the project named by `raw_project_id`
///
/// # Errors
///
/// - `MissingProjectId` / `InvalidProjectId` for a bad path segment
/// - `NotMember` if the caller holds no membership in the project
/// - `InsufficientRole` if their role is not in `allowed`
pub async fn authorize(
    pool: &PgPool,
    user_id: Uuid,
    raw_project_id: &str,
    allowed: &[ProjectRole],
) -> Result<ProjectAccess, AuthzError> {
    let project_id = parse_project_id(raw_project_id)?;

    let role = ProjectMember::get_role(pool, project_id, user_id)
        .await?
        .ok_or(AuthzError::NotMember)?;

    check_role(role, allowed).map_err(|e| {
        debug!(%user_id, %project_id, role = %role, "Role not permitted for this action");
        e
    })?;

    Ok(ProjectAccess { project_id, role })
}
