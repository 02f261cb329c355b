/// Project model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Creating a project also makes its creator an `admin` member, in the same
/// transaction. Deleting a project cascades to memberships, tasks and
/// subtasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::membership::{ProjectMember, ProjectRole};

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
}

/// Input for updating a project
///
/// `description: None` clears the description.
#[derive(Debug, Clone)]
pub struct UpdateProject {
    pub name: String,
    pub description: Option<String>,
}

/// Project as listed for one of its members, with a member count
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOverview {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub members: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}

/// A project the caller belongs to, and the caller's role in it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWithRole {
    pub project: ProjectOverview,
    pub role: ProjectRole,
}

#[derive(sqlx::FromRow)]
struct ProjectWithRoleRow {
    #[sqlx(flatten)]
    project: ProjectOverview,
    role: ProjectRole,
}

impl Project {
    /// Creates a project and adds the creator as `admin`
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(data.name.trim())
        .bind(data.description)
        .bind(data.created_by)
        .fetch_one(&mut *tx)
        .await?;

        ProjectMember::upsert(&mut *tx, data.created_by, project.id, ProjectRole::Admin).await?;

        tx.commit().await?;

        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, created_by, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Updates a project's name and description
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name.trim())
        .bind(data.description)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a project, returning the deleted row if it existed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            DELETE FROM projects
            WHERE id = $1
            RETURNING id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists the projects a user belongs to, with member counts and the
    /// user's role in each
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ProjectWithRole>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ProjectWithRoleRow>(
            r#"
            SELECT p.id, p.name, p.description, p.created_at, p.created_by,
                   (SELECT COUNT(*) FROM project_members c WHERE c.project_id = p.id) AS members,
                   pm.role
            FROM project_members pm
            INNER JOIN projects p ON p.id = pm.project_id
            WHERE pm.user_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProjectWithRole {
                project: row.project,
                role: row.role,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_with_role_shape() {
        let entry = ProjectWithRole {
            project: ProjectOverview {
                id: Uuid::new_v4(),
                name: "Apollo".to_string(),
                description: None,
                members: 3,
                created_at: Utc::now(),
                created_by: Uuid::new_v4(),
            },
            role: ProjectRole::ProjectAdmin,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["project"]["name"], "Apollo");
        assert_eq!(json["project"]["members"], 3);
        assert!(json["project"].get("createdBy").is_some());
        assert_eq!(json["role"], "project_admin");
    }
}
