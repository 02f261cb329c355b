/// Project endpoints
///
/// # Endpoints
///
/// - `GET    /api/v1/projects`: projects the caller belongs to
/// - `POST   /api/v1/projects`: create a project, caller becomes `admin`
/// - `GET    /api/v1/projects/:projectId`: any member
/// - `PUT    /api/v1/projects/:projectId`: admin only
/// - `DELETE /api/v1/projects/:projectId`: admin only, cascades to members,
///   tasks and subtasks

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
        project::{CreateProject, Project, ProjectWithRole, UpdateProject},
    },
};
use tracing::info;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::AppJson,
    response::ApiResponse,
};

#[derive(Debug, Deserialize, Validate)]
pub struct ProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Project name is required"))]
    #[serde(default)]
    pub name: String,

    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
}

impl ProjectRequest {
    /// Trims the name and turns a blank description into `None`
    fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<ProjectWithRole>>> {
    let projects = Project::list_for_user(&state.db, auth.user_id()).await?;

    Ok(ApiResponse::ok(projects, "Project Fetched Successfully"))
}

/// Create a project
///
/// The project row and the creator's `admin` membership are written in one
/// transaction.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<ProjectRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let req = req.normalized();
    req.validate()?;

    let project = Project::create(
        &state.db,
        CreateProject {
            name: req.name,
            description: req.description,
            created_by: auth.user_id(),
        },
    )
    .await?;

    info!(user_id = %auth.user_id(), project_id = %project.id, "Project created");

    Ok(ApiResponse::created(
        json!({ "project": project }),
        "Project Created Successfully",
    ))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let access = authorize(&state.db, auth.user_id(), &project_id, ProjectRole::ALL).await?;

    let project = Project::find_by_id(&state.db, access.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(ApiResponse::ok(
        json!({ "project": project }),
        "Project Fetched Successfully",
    ))
}

/// Replace a project's name and description
///
/// Omitting `description` clears it.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<String>,
    AppJson(req): AppJson<ProjectRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let access = authorize(&state.db, auth.user_id(), &project_id, ProjectRole::ADMIN_ONLY).await?;

    let req = req.normalized();
    req.validate()?;

    let project = Project::update(
        &state.db,
        access.project_id,
        UpdateProject {
            name: req.name,
            description: req.description,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Project Not Found".to_string()))?;

    info!(user_id = %auth.user_id(), project_id = %project.id, "Project updated");

    Ok(ApiResponse::ok(
        json!({ "project": project }),
        "Project Updated Successfully",
    ))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let access = authorize(&state.db, auth.user_id(), &project_id, ProjectRole::ADMIN_ONLY).await?;

    let project = Project::delete(&state.db, access.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project Not Found".to_string()))?;

    info!(user_id = %auth.user_id(), project_id = %project.id, "Project deleted");

    Ok(ApiResponse::ok(
        json!({ "project": project }),
        "Project Deleted Successfully",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_request_normalization() {
        let req: ProjectRequest =
            serde_json::from_str(r#"{"name":"  Apollo  ","description":"   "}"#).unwrap();
        let req = req.normalized();

        assert_eq!(req.name, "Apollo");
        assert!(req.description.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let req: ProjectRequest = serde_json::from_str(r#"{"name":"   "}"#).unwrap();
        let errors = req.normalized().validate().unwrap_err();

        assert!(errors.field_errors().contains_key("name"));
    }
}
