/// Task endpoints
///
/// Every member can read tasks; only `admin` and `project_admin` can create,
/// update or delete them. Tasks are always looked up within the project from
/// the path, so a task ID from another project answers 404.
///
/// Setting `assignedTo` records the caller as `assignedBy`. The assignee
/// must already be a member of the project.

use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use taskmanager_shared::{
    auth::{authorization::authorize, middleware::AuthContext},
    models::{
        membership::{ProjectMember, ProjectRole},
        subtask::Subtask,
        task::{Attachment, CreateTask, Task, TaskFilter, TaskStatus, UpdateTask},
    },
};
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::AppJson,
    response::ApiResponse,
    routes::parse_path_id,
};

/// Distinguishes an absent field from an explicit `null`
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_attachments(attachments: &[Attachment]) -> Result<(), ValidationError> {
    for attachment in attachments {
        if attachment.url.trim().is_empty() || attachment.mimetype.trim().is_empty() {
            let mut err = ValidationError::new("attachment");
            err.message = Some("Attachment url and mimetype are required".into());
            return Err(err);
        }
        if attachment.size < 0 {
            let mut err = ValidationError::new("attachment");
            err.message = Some("Attachment size cannot be negative".into());
            return Err(err);
        }
    }
    Ok(())
}

fn parse_status(raw: &str) -> ApiResult<TaskStatus> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::invalid_field("status", "Status must be todo, in-progress or done"))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Task title is required"))]
    #[serde(default)]
    pub title: String,

    pub description: Option<String>,

    pub assigned_to: Option<Uuid>,

    pub status: Option<String>,

    #[validate(custom(function = "validate_attachments"))]
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Task title cannot be empty"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub assigned_to: Option<Option<Uuid>>,

    pub status: Option<String>,

    #[validate(custom(function = "validate_attachments"))]
    pub attachments: Option<Vec<Attachment>>,
}

fn trimmed_or_none(text: String) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl CreateTaskRequest {
    /// Trims the title and turns a blank description into `None`
    fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.and_then(trimmed_or_none),
            ..self
        }
    }
}

impl UpdateTaskRequest {
    /// Trims the title; a blank description clears it
    fn normalized(self) -> Self {
        Self {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description.map(|d| d.and_then(trimmed_or_none)),
            ..self
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub status: Option<String>,
    pub assigned_to: Option<String>,
}

impl TaskQuery {
    fn into_filter(self) -> ApiResult<TaskFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_status(raw)?),
        };
        let assigned_to = match self.assigned_to.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_path_id(raw, "assignee")?),
        };

        Ok(TaskFilter {
            status,
            assigned_to,
        })
    }
}

/// A task together with its subtasks
#[derive(Debug, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub subtasks: Vec<Subtask>,
}

async fn ensure_assignee_is_member(pool: &PgPool, project_id: Uuid, assignee: Uuid) -> ApiResult<()> {
    match ProjectMember::get_role(pool, project_id, assignee).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::BadRequest(
            "Assignee is not a member of this project".to_string(),
        )),
    }
}

/// Fetches a task scoped to its project or fails with 404
pub(crate) async fn find_task(pool: &PgPool, project_id: Uuid, raw_task_id: &str) -> ApiResult<Task> {
    let task_id = parse_path_id(raw_task_id, "task")?;

    Task::find_in_project(pool, project_id, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<String>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<ApiResponse<Vec<Task>>> {
    let access = authorize(&state.db, auth.user_id(), &project_id, ProjectRole::ALL).await?;

    let tasks = Task::list_by_project(&state.db, access.project_id, query.into_filter()?).await?;

    Ok(ApiResponse::ok(tasks, "Tasks Fetched Successfully"))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<TaskDetail>> {
    let access = authorize(&state.db, auth.user_id(), &project_id, ProjectRole::ALL).await?;

    let task = find_task(&state.db, access.project_id, &task_id).await?;
    let subtasks = Subtask::list_by_task(&state.db, task.id).await?;

    Ok(ApiResponse::ok(
        TaskDetail { task, subtasks },
        "Task Fetched Successfully",
    ))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<String>,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let access =
        authorize(&state.db, auth.user_id(), &project_id, ProjectRole::TASK_MANAGERS).await?;

    let req = req.normalized();
    req.validate()?;

    let status = match req.status.as_deref() {
        Some(raw) => parse_status(raw)?,
        None => TaskStatus::default(),
    };

    if let Some(assignee) = req.assigned_to {
        ensure_assignee_is_member(&state.db, access.project_id, assignee).await?;
    }

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title,
            description: req.description,
            project_id: access.project_id,
            assigned_to: req.assigned_to,
            assigned_by: req.assigned_to.map(|_| auth.user_id()),
            status,
            attachments: req.attachments,
        },
    )
    .await?;

    info!(
        user_id = %auth.user_id(),
        project_id = %access.project_id,
        task_id = %task.id,
        "Task created"
    );

    Ok(ApiResponse::created(json!({ "task": task }), "Task Created Successfully"))
}

/// Partially update a task
///
/// Absent fields are left alone; `"assignedTo": null` unassigns the task
/// and clears `assignedBy`.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(String, String)>,
    AppJson(req): AppJson<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let access =
        authorize(&state.db, auth.user_id(), &project_id, ProjectRole::TASK_MANAGERS).await?;

    let task_id = parse_path_id(&task_id, "task")?;
    let req = req.normalized();
    req.validate()?;

    let status = req.status.as_deref().map(parse_status).transpose()?;

    if let Some(Some(assignee)) = req.assigned_to {
        ensure_assignee_is_member(&state.db, access.project_id, assignee).await?;
    }

    let changes = UpdateTask {
        title: req.title,
        description: req.description,
        assigned_to: req.assigned_to,
        assigned_by: req
            .assigned_to
            .map(|assignee| assignee.map(|_| auth.user_id())),
        status,
        attachments: req.attachments,
    };

    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let task = Task::update(&state.db, access.project_id, task_id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    info!(
        user_id = %auth.user_id(),
        project_id = %access.project_id,
        task_id = %task.id,
        "Task updated"
    );

    Ok(ApiResponse::ok(json!({ "task": task }), "Task Updated Successfully"))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Value>> {
    let access =
        authorize(&state.db, auth.user_id(), &project_id, ProjectRole::TASK_MANAGERS).await?;

    let task_id = parse_path_id(&task_id, "task")?;

    let task = Task::delete(&state.db, access.project_id, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    info!(
        user_id = %auth.user_id(),
        project_id = %access.project_id,
        task_id = %task.id,
        "Task deleted"
    );

    Ok(ApiResponse::ok(json!({ "task": task }), "Task Deleted Successfully"))
}
