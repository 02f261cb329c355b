/// Database models for the task manager
///
/// Each model exposes associated async functions that take a `&PgPool` and
/// run plain `sqlx` queries.
///
/// # Models
///
/// - `user`: accounts, credentials and token material
/// - `project`: projects and the per-user project listing
/// - `membership`: (user, project, role) associations
/// - `task`: tasks within a project
/// - `subtask`: checklist items within a task

pub mod membership;
pub mod project;
pub mod subtask;
pub mod task;
pub mod user;
