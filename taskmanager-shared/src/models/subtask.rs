/// Subtask model and database operations
///
/// A subtask is a checklist item under a task. Lookups are scoped by
/// `task_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subtasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     is_completed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: Uuid,
    pub title: String,
    pub task_id: Uuid,
    pub is_completed: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a subtask
#[derive(Debug, Clone, Default)]
pub struct UpdateSubtask {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

impl Subtask {
    pub async fn create(
        pool: &PgPool,
        task_id: Uuid,
        title: &str,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(
            r#"
            INSERT INTO subtasks (title, task_id, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, title, task_id, is_completed, created_by, created_at, updated_at
            "#,
        )
        .bind(title.trim())
        .bind(task_id)
        .bind(created_by)
        .fetch_one(pool)
        .await
    }

    /// Lists a task's subtasks in creation order
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(
            r#"
            SELECT id, title, task_id, is_completed, created_by, created_at, updated_at
            FROM subtasks
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial update; `None` fields keep their current value
    pub async fn update(
        pool: &PgPool,
        task_id: Uuid,
        id: Uuid,
        data: UpdateSubtask,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(
            r#"
            UPDATE subtasks
            SET title = COALESCE($3, title),
                is_completed = COALESCE($4, is_completed),
                updated_at = NOW()
            WHERE id = $1 AND task_id = $2
            RETURNING id, title, task_id, is_completed, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(task_id)
        .bind(data.title.map(|t| t.trim().to_string()))
        .bind(data.is_completed)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(
        pool: &PgPool,
        task_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subtask>(
            r#"
            DELETE FROM subtasks
            WHERE id = $1 AND task_id = $2
            RETURNING id, title, task_id, is_completed, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(task_id)
        .fetch_optional(pool)
        .await
    }
}
