/// API route handlers, organized by resource
///
/// - `health`: health check
/// - `auth`: registration, sessions, email verification and passwords
/// - `projects`: project CRUD
/// - `members`: project membership management
/// - `tasks`: tasks within a project
/// - `subtasks`: subtasks within a task

pub mod auth;
pub mod health;
pub mod members;
pub mod projects;
pub mod subtasks;
pub mod tasks;

use uuid::Uuid;
use validator::ValidationError;

use crate::error::{ApiError, ApiResult};

/// Matches the `email VARCHAR(255)` column
const MAX_EMAIL_LENGTH: usize = 255;

/// Rejects emails that would overflow the users table
pub(crate) fn validate_email_length(email: &str) -> Result<(), ValidationError> {
    if email.trim().chars().count() > MAX_EMAIL_LENGTH {
        let mut err = ValidationError::new("length");
        err.message = Some("Email must be at most 255 characters long".into());
        return Err(err);
    }
    Ok(())
}

/// Parses an id taken from the request path
pub(crate) fn parse_path_id(raw: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid {} id", what)))
}
