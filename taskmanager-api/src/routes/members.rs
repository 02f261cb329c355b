/// Project membership endpoints
///
/// Listing is open to every member; adding, re-roling and removing members
/// is admin only. Adding an existing member changes their role instead of
/// creating a second row.

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use taskmanager_shared::{
    auth::{authorization::authorize, middleware::AuthContext},
    models::{
        membership::{MemberDetail, ProjectMember, ProjectRole},
        user::User,
    },
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::AppJson,
    response::ApiResponse,
    routes::{parse_path_id, validate_email_length},
};

const SELF_DEMOTION_MESSAGE: &str = "Admin cannot change their own role";

/// An admin may not strip their own admin role
fn ensure_not_self_demotion(caller: Uuid, member_id: Uuid, role: ProjectRole) -> ApiResult<()> {
    if member_id == caller && role != ProjectRole::Admin {
        return Err(ApiError::BadRequest(SELF_DEMOTION_MESSAGE.to_string()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(
        length(min = 1, message = "Email is required"),
        custom(function = "validate_email_length"),
        email(message = "Email is Invalid")
    )]
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRoleRequest {
    #[serde(default)]
    pub new_role: String,
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<String>,
) -> ApiResult<ApiResponse<Vec<MemberDetail>>> {
    let access = authorize(&state.db, auth.user_id(), &project_id, ProjectRole::ALL).await?;

    let members = ProjectMember::list_members(&state.db, access.project_id).await?;

    Ok(ApiResponse::ok(members, "Project members fetched"))
}

/// Add a user to the project by email
///
/// # Errors
///
/// - `400 Bad Request`: unknown role, or the admin demoting themselves
/// - `404 Not Found`: no user with that email
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<String>,
    AppJson(req): AppJson<AddMemberRequest>,
) -> ApiResult<ApiResponse<Value>> {
    let access = authorize(&state.db, auth.user_id(), &project_id, ProjectRole::ADMIN_ONLY).await?;

    req.validate()?;
    let role: ProjectRole = req.role.trim().parse()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;
    ensure_not_self_demotion(auth.user_id(), user.id, role)?;

    ProjectMember::upsert(&state.db, user.id, access.project_id, role).await?;

    info!(
        user_id = %auth.user_id(),
        project_id = %access.project_id,
        member_id = %user.id,
        role = %role,
        "Project member added"
    );

    Ok(ApiResponse::created(json!({}), "Project Member Added"))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(String, String)>,
    AppJson(req): AppJson<UpdateMemberRoleRequest>,
) -> ApiResult<ApiResponse<ProjectMember>> {
    let access = authorize(&state.db, auth.user_id(), &project_id, ProjectRole::ADMIN_ONLY).await?;

    let member_id = parse_path_id(&user_id, "user")?;
    let role: ProjectRole = req.new_role.trim().parse()?;
    ensure_not_self_demotion(auth.user_id(), member_id, role)?;

    let member = ProjectMember::update_role(&state.db, access.project_id, member_id, role)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project member not found".to_string()))?;

    info!(
        user_id = %auth.user_id(),
        project_id = %access.project_id,
        member_id = %member_id,
        role = %role,
        "Project member role changed"
    );

    Ok(ApiResponse::ok(member, "Project Member Role Changed"))
}

/// Remove a member from the project
///
/// # Errors
///
/// - `400 Bad Request`: the admin is trying to remove themselves
/// - `404 Not Found`: the user is not a member
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<ProjectMember>> {
    let access = authorize(&state.db, auth.user_id(), &project_id, ProjectRole::ADMIN_ONLY).await?;

    let member_id = parse_path_id(&user_id, "user")?;
    if member_id == auth.user_id() {
        return Err(ApiError::BadRequest(
            "Admin cannot remove themselves".to_string(),
        ));
    }

    let member = ProjectMember::delete(&state.db, access.project_id, member_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project member not found".to_string()))?;

    info!(
        user_id = %auth.user_id(),
        project_id = %access.project_id,
        member_id = %member_id,
        "Project member removed"
    );

    Ok(ApiResponse::ok(member, "Member Deleted Successfully from Project"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_role_request_is_camel_case() {
        let req: UpdateMemberRoleRequest =
            serde_json::from_str(r#"{"newRole":"project_admin"}"#).unwrap();
        assert_eq!(req.new_role.parse::<ProjectRole>().unwrap(), ProjectRole::ProjectAdmin);
    }

    #[test]
    fn test_unknown_role_maps_to_bad_request() {
        let err: ApiError = "owner".parse::<ProjectRole>().unwrap_err().into();
        match err {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Invalid Role"),
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_admin_cannot_demote_themselves() {
        let admin = Uuid::new_v4();

        match ensure_not_self_demotion(admin, admin, ProjectRole::Member) {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, SELF_DEMOTION_MESSAGE),
            other => panic!("Expected BadRequest, got {:?}", other),
        }
        assert!(ensure_not_self_demotion(admin, admin, ProjectRole::Admin).is_ok());
        assert!(ensure_not_self_demotion(admin, Uuid::new_v4(), ProjectRole::Member).is_ok());
    }

    #[test]
    fn test_add_member_requires_valid_email() {
        let req = AddMemberRequest {
            email: "nope".to_string(),
            role: "member".to_string(),
        };
        assert!(req.validate().unwrap_err().field_errors().contains_key("email"));
    }
}
