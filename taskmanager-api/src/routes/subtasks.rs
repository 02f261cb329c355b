/// Subtask endpoints
///
/// Any member can add subtasks and tick them off; deleting one needs
/// `admin` or `project_admin`. The parent task is resolved within the
/// project first, then the subtask within that task.

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use taskmanager_shared::{
    auth::{authorization::authorize, middleware::AuthContext},
    models::{
        membership::ProjectRole,
        subtask::{Subtask, UpdateSubtask},
    },
};
use tracing::info;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::AppJson,
    response::ApiResponse,
    routes::{parse_path_id, tasks::find_task},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubtaskRequest {
    #[validate(length(min = 1, max = 255, message = "Subtask title is required"))]
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubtaskRequest {
    #[validate(length(min = 1, max = 255, message = "Subtask title cannot be empty"))]
    pub title: Option<String>,

    pub is_completed: Option<bool>,
}

pub async fn create_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(String, String)>,
    AppJson(req): AppJson<CreateSubtaskRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let access = authorize(&state.db, auth.user_id(), &project_id, ProjectRole::ALL).await?;

    let title = req.title.trim().to_string();
    CreateSubtaskRequest { title: title.clone() }.validate()?;

    let task = find_task(&state.db, access.project_id, &task_id).await?;
    let subtask = Subtask::create(&state.db, task.id, &title, auth.user_id()).await?;

    info!(
        user_id = %auth.user_id(),
        task_id = %task.id,
        subtask_id = %subtask.id,
        "Subtask created"
    );

    Ok(ApiResponse::created(
        json!({ "subtask": subtask }),
        "Subtask Created Successfully",
    ))
}

pub async fn update_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id, subtask_id)): Path<(String, String, String)>,
    AppJson(req): AppJson<UpdateSubtaskRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let access = authorize(&state.db, auth.user_id(), &project_id, ProjectRole::ALL).await?;

    let req = UpdateSubtaskRequest {
        title: req.title.map(|t| t.trim().to_string()),
        is_completed: req.is_completed,
    };
    req.validate()?;

    if req.title.is_none() && req.is_completed.is_none() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let task = find_task(&state.db, access.project_id, &task_id).await?;
    let subtask_id = parse_path_id(&subtask_id, "subtask")?;

    let subtask = Subtask::update(
        &state.db,
        task.id,
        subtask_id,
        UpdateSubtask {
            title: req.title,
            is_completed: req.is_completed,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Subtask not found".to_string()))?;

    Ok(ApiResponse::ok(
        json!({ "subtask": subtask }),
        "Subtask Updated Successfully",
    ))
}

pub async fn delete_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id, subtask_id)): Path<(String, String, String)>,
) -> ApiResult<ApiResponse<Value>> {
    let access =
        authorize(&state.db, auth.user_id(), &project_id, ProjectRole::TASK_MANAGERS).await?;

    let task = find_task(&state.db, access.project_id, &task_id).await?;
    let subtask_id = parse_path_id(&subtask_id, "subtask")?;

    let subtask = Subtask::delete(&state.db, task.id, subtask_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subtask not found".to_string()))?;

    info!(
        user_id = %auth.user_id(),
        task_id = %task.id,
        subtask_id = %subtask.id,
        "Subtask deleted"
    );

    Ok(ApiResponse::ok(
        json!({ "subtask": subtask }),
        "Subtask Deleted Successfully",
    ))
}
