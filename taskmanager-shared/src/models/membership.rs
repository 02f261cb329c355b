/// Project membership model and database operations
///
/// A membership is the (user, project, role) association that grants
/// project-scoped authorization.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('admin', 'project_admin', 'member');
///
/// CREATE TABLE project_members (
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     role project_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (user_id, project_id)
/// );
/// ```
///
/// The composite primary key guarantees at most one row per pair. Adding a
/// member is an upsert on that key, so re-adding an existing member changes
/// their role instead of creating a duplicate, and concurrent adds converge
/// to a single row.
///
/// # Roles
///
/// - **admin**: manages the project and its members
/// - **project_admin**: manages tasks
/// - **member**: reads the project and works on subtasks
///
/// # Example
///
/// ```no_run
/// use taskmanager_shared::models::membership::{ProjectMember, ProjectRole};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid, project_id: Uuid) -> Result<(), sqlx::Error> {
/// ProjectMember::upsert(&pool, user_id, project_id, ProjectRole::Member).await?;
/// ProjectMember::upsert(&pool, user_id, project_id, ProjectRole::ProjectAdmin).await?;
///
/// let role = ProjectMember::get_role(&pool, project_id, user_id).await?;
/// assert_eq!(role, Some(ProjectRole::ProjectAdmin));
/// # Ok(())
/// # }
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Role a user holds within one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Admin,
    ProjectAdmin,
    Member,
}

impl ProjectRole {
    /// Every role; used for read access to a project
    pub const ALL: &'static [ProjectRole] =
        &[ProjectRole::Admin, ProjectRole::ProjectAdmin, ProjectRole::Member];

    /// Roles that may manage tasks
    pub const TASK_MANAGERS: &'static [ProjectRole] =
        &[ProjectRole::Admin, ProjectRole::ProjectAdmin];

    /// Roles that may manage the project itself and its members
    pub const ADMIN_ONLY: &'static [ProjectRole] = &[ProjectRole::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Admin => "admin",
            ProjectRole::ProjectAdmin => "project_admin",
            ProjectRole::Member => "member",
        }
    }

    /// Checks whether this role is one of `allowed`
    pub fn is_in(&self, allowed: &[ProjectRole]) -> bool {
        allowed.contains(self)
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid Role")]
pub struct InvalidRole;

impl FromStr for ProjectRole {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ProjectRole::Admin),
            "project_admin" => Ok(ProjectRole::ProjectAdmin),
            "member" => Ok(ProjectRole::Member),
            _ => Err(InvalidRole),
        }
    }
}

/// Membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public-safe subset of a user, as shown in member listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUser {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// A member of a project together with their public user fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    pub user: MemberUser,
    pub project_id: Uuid,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    user_id: Uuid,
    username: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    project_id: Uuid,
    role: ProjectRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MemberRow> for MemberDetail {
    fn from(row: MemberRow) -> Self {
        Self {
            user: MemberUser {
                id: row.user_id,
                username: row.username,
                full_name: row.full_name,
                avatar_url: row.avatar_url,
            },
            project_id: row.project_id,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl ProjectMember {
    /// Adds a user to a project, or changes their role if already a member
    ///
    /// Accepts any executor so project creation can run it inside its
    /// transaction.
    pub async fn upsert<'e, E>(
        executor: E,
        user_id: Uuid,
        project_id: Uuid,
        role: ProjectRole,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (user_id, project_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, project_id)
            DO UPDATE SET role = EXCLUDED.role, updated_at = NOW()
            RETURNING user_id, project_id, role, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .bind(role)
        .fetch_one(executor)
        .await
    }

    /// Gets a user's role in a project, `None` if not a member
    pub async fn get_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectRole>, sqlx::Error> {
        sqlx::query_scalar::<_, ProjectRole>(
            r#"
            SELECT role
            FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Changes the role of an existing member
    ///
    /// Returns `None` if the user is not a member of the project.
    pub async fn update_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            UPDATE project_members
            SET role = $3, updated_at = NOW()
            WHERE project_id = $1 AND user_id = $2
            RETURNING user_id, project_id, role, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(pool)
        .await
    }

    /// Removes a member, returning the deleted row if there was one
    pub async fn delete(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            DELETE FROM project_members
            WHERE project_id = $1 AND user_id = $2
            RETURNING user_id, project_id, role, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists a project's members joined with their public user fields
    pub async fn list_members(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<MemberDetail>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT pm.user_id, u.username, u.full_name, u.avatar_url,
                   pm.project_id, pm.role, pm.created_at, pm.updated_at
            FROM project_members pm
            INNER JOIN users u ON u.id = pm.user_id
            WHERE pm.project_id = $1
            ORDER BY pm.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(MemberDetail::from).collect())
    }

    /// Counts members of a project
    pub async fn count_by_project(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM project_members
            WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_role_as_str() {
        assert_eq!(ProjectRole::Admin.as_str(), "admin");
        assert_eq!(ProjectRole::ProjectAdmin.as_str(), "project_admin");
        assert_eq!(ProjectRole::Member.as_str(), "member");
    }

    #[test]
    fn test_project_role_from_str() {
        for role in ProjectRole::ALL {
            assert_eq!(role.as_str().parse::<ProjectRole>(), Ok(*role));
        }

        assert_eq!("owner".parse::<ProjectRole>(), Err(InvalidRole));
        assert_eq!("Admin".parse::<ProjectRole>(), Err(InvalidRole));
        assert_eq!("".parse::<ProjectRole>(), Err(InvalidRole));
    }

    #[test]
    fn test_project_role_serde_matches_db_names() {
        let json = serde_json::to_string(&ProjectRole::ProjectAdmin).unwrap();
        assert_eq!(json, "\"project_admin\"");

        let role: ProjectRole = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(role, ProjectRole::Member);
    }

    #[test]
    fn test_role_sets() {
        assert!(ProjectRole::Admin.is_in(ProjectRole::ADMIN_ONLY));
        assert!(!ProjectRole::ProjectAdmin.is_in(ProjectRole::ADMIN_ONLY));
        assert!(!ProjectRole::Member.is_in(ProjectRole::ADMIN_ONLY));

        assert!(ProjectRole::ProjectAdmin.is_in(ProjectRole::TASK_MANAGERS));
        assert!(!ProjectRole::Member.is_in(ProjectRole::TASK_MANAGERS));

        assert!(ProjectRole::Member.is_in(ProjectRole::ALL));
    }

    #[test]
    fn test_member_detail_shape() {
        let now = Utc::now();
        let detail = MemberDetail::from(MemberRow {
            user_id: Uuid::new_v4(),
            username: "abc".to_string(),
            full_name: None,
            avatar_url: None,
            project_id: Uuid::new_v4(),
            role: ProjectRole::Member,
            created_at: now,
            updated_at: now,
        });

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["user"]["username"], "abc");
        assert_eq!(json["role"], "member");
        assert!(json["user"].get("email").is_none());
    }
}
