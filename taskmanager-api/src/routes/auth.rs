/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/v1/auth/register`: create an unverified account
/// - `POST /api/v1/auth/login`: issue tokens and set cookies
/// - `POST /api/v1/auth/logout`: forget the refresh token, clear cookies
/// - `GET  /api/v1/auth/current-user`: the caller's public profile
/// - `POST /api/v1/auth/refresh-token`: rotate the token pair
/// - `GET  /api/v1/auth/verify-email/:token`: consume a verification token
/// - `POST /api/v1/auth/resend-email-verification`: issue a new verification token
/// - `POST /api/v1/auth/forgot-password`: email a reset link
/// - `POST /api/v1/auth/reset-password/:token`: consume a reset token
/// - `POST /api/v1/auth/change-password`: change password with the old one
///
/// Verification and reset tokens are random, stored only as SHA-256 hashes
/// and valid for 20 minutes. Consuming one is a single conditional update,
/// so each token works at most once.

use std::borrow::Cow;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Extension,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskmanager_shared::{
    auth::{
        cookie::{extract_cookie, REFRESH_TOKEN_COOKIE},
        jwt::{validate_refresh_token, TokenPair},
        middleware::AuthContext,
        password::{validate_password_strength, verify_password_async},
        token::{generate_temporary_token, hash_token},
    },
    email::{dispatch_email, EmailMessage, MailContent},
    models::user::{NewUser, PublicUser, User, UserError},
};
use tracing::{info, warn};
use validator::{Validate, ValidationError};

use crate::{
    app::AppState,
    cookies::{clear_token_cookies, set_token_cookies},
    error::{ApiError, ApiResult},
    extract::AppJson,
    response::ApiResponse,
    routes::validate_email_length,
};

const VERIFY_EMAIL_SUBJECT: &str = "Please verify your email";
const RESEND_VERIFICATION_SUBJECT: &str = "Resending Verification Email";
const RESET_PASSWORD_SUBJECT: &str = "Reset Your Account Password";

/// Matches the `username VARCHAR(64)` column
const MAX_USERNAME_LENGTH: usize = 64;

fn validation_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    let username = username.trim();

    if username.is_empty() {
        return Err(validation_error("required", "Username is required"));
    }
    if username != username.to_lowercase() {
        return Err(validation_error("lowercase", "Username must be in lower case"));
    }
    if username.chars().count() < 3 {
        return Err(validation_error(
            "length",
            "Username must be atleast 3 characters long",
        ));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(validation_error(
            "length",
            "Username must be at most 64 characters long",
        ));
    }

    Ok(())
}

fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    if password.trim().is_empty() {
        return Err(validation_error("required", "Password field cannot be empty"));
    }

    validate_password_strength(password).map_err(|message| validation_error("strength", message))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, message = "Email is required"),
        custom(function = "validate_email_length"),
        email(message = "Email is Invalid")
    )]
    #[serde(default)]
    pub email: String,

    #[validate(custom(function = "validate_username"))]
    #[serde(default)]
    pub username: String,

    #[validate(custom(function = "validate_new_password"))]
    #[serde(default)]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Full name must be 1 to 100 characters"))]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email is Invalid"))]
    #[serde(default)]
    pub email: String,

    #[validate(length(min = 1, message = "Enter your password"))]
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(
        length(min = 1, message = "Email field is required"),
        email(message = "Email is invalid")
    )]
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(custom(function = "validate_new_password"))]
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old Password is required"))]
    #[serde(default)]
    pub old_password: String,

    #[validate(custom(function = "validate_new_password"))]
    #[serde(default)]
    pub new_password: String,
}

fn empty() -> Value {
    json!({})
}

fn is_unique_violation(err: &UserError) -> bool {
    match err {
        UserError::Database(sqlx::Error::Database(db_err)) => {
            db_err.code().as_deref() == Some("23505")
        }
        _ => false,
    }
}

/// Register a new user
///
/// Creates an unverified account and emails a verification link.
///
/// ```text
/// POST /api/v1/auth/register
///
/// { "email": "a@b.com", "username": "abc", "password": "Abcdefg1!", "fullName": "A B" }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: email or username already taken
/// - `422 Unprocessable Entity`: invalid body
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<ApiResponse<Value>> {
    req.validate()?;

    if User::exists_by_email_or_username(&state.db, &req.email, &req.username).await? {
        return Err(ApiError::Conflict(
            "User with email or username already exist".to_string(),
        ));
    }

    let token = generate_temporary_token();

    let user = User::create(
        &state.db,
        NewUser {
            email: req.email,
            username: req.username,
            full_name: req.full_name.map(|name| name.trim().to_string()),
            password: req.password,
            email_verification_token: Some(token.hashed.clone()),
            email_verification_expiry: Some(token.expires_at),
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("User with email or username already exist".to_string())
        } else {
            e.into()
        }
    })?;

    info!(user_id = %user.id, "User registered");

    let content =
        MailContent::email_verification(&user.username, &state.config.verification_url(&token.unhashed));
    dispatch_email(
        state.mailer.as_ref(),
        EmailMessage::render(&user.email, VERIFY_EMAIL_SUBJECT, &content, &state.product),
    )
    .await;

    Ok(ApiResponse::created(
        json!({ "user": user.to_public() }),
        "User Registered Successfully and Verification Email has been send on your email",
    ))
}

/// Log in with email and password
///
/// Issues a new token pair, stores the refresh token as the user's only
/// valid one and sets both as cookies. The tokens are also returned in the
/// body for clients that don't use cookies.
///
/// # Errors
///
/// - `400 Bad Request`: "Email is required", "User does not exists" or
///   "Invalid Credentials"
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.email.trim().is_empty() {
        return Err(ApiError::BadRequest("Email is required".to_string()));
    }
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("User does not exists".to_string()))?;

    if !verify_password_async(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::BadRequest("Invalid Credentials".to_string()));
    }

    let tokens = state.tokens.issue_pair(user.id, &user.email, &user.username)?;
    User::store_refresh_token(&state.db, user.id, &tokens.refresh_token).await?;

    info!(user_id = %user.id, "User logged in");

    let cookies = set_token_cookies(&state.config, &tokens);
    let TokenPair {
        access_token,
        refresh_token,
    } = tokens;

    Ok((
        cookies,
        ApiResponse::ok(
            LoginResponse {
                user: user.to_public(),
                access_token,
                refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// Log out
///
/// Clears the stored refresh token so it can't be rotated again, and
/// clears both cookies. Outstanding access tokens stay valid until they
/// expire.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    User::clear_refresh_token(&state.db, auth.user_id()).await?;

    info!(user_id = %auth.user_id(), "User logged out");

    Ok((
        clear_token_cookies(&state.config),
        ApiResponse::ok(empty(), "User Logged Out"),
    ))
}

pub async fn current_user(Extension(auth): Extension<AuthContext>) -> ApiResponse<PublicUser> {
    ApiResponse::ok(auth.user, "Current User Fetched")
}

/// Exchange a refresh token for a new pair
///
/// The token comes from the `refreshToken` cookie, or from the body when
/// there is no cookie. It must validate and match the stored value; the
/// swap to the new token is conditional on the old one still being stored,
/// so a token can be used at most once even under concurrent requests.
///
/// # Errors
///
/// - `401 Unauthorized`: "Unauthorized Access" (no token), "Invalid refresh
///   token" (bad token or unknown user), "Refresh token is expired" (token
///   already rotated out)
pub async fn refresh_access_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<AppJson<RefreshRequest>>,
) -> ApiResult<impl IntoResponse> {
    let incoming = extract_cookie(&headers, REFRESH_TOKEN_COOKIE)
        .or_else(|| {
            body.and_then(|AppJson(req)| req.refresh_token)
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
        })
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized Access".to_string()))?;

    let claims = validate_refresh_token(&incoming, &state.tokens.refresh_secret).map_err(|e| {
        warn!(error = %e, "Refresh token rejected");
        ApiError::Unauthorized("Invalid refresh token".to_string())
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    let expired = || ApiError::Unauthorized("Refresh token is expired".to_string());

    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        warn!(user_id = %user.id, "Refresh token does not match the stored token");
        return Err(expired());
    }

    let tokens = state.tokens.issue_pair(user.id, &user.email, &user.username)?;

    if !User::rotate_refresh_token(&state.db, user.id, &incoming, &tokens.refresh_token).await? {
        warn!(user_id = %user.id, "Refresh token was rotated by a concurrent request");
        return Err(expired());
    }

    Ok((
        set_token_cookies(&state.config, &tokens),
        ApiResponse::ok(tokens, "Access Token Generated Successfully"),
    ))
}

/// Verify an email address
///
/// # Errors
///
/// - `400 Bad Request`: "Token is invalid or expired"
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest(
            "Email Verification token is missing".to_string(),
        ));
    }

    let user = User::verify_email(&state.db, &hash_token(token))
        .await?
        .ok_or_else(|| ApiError::BadRequest("Token is invalid or expired".to_string()))?;

    info!(user_id = %user.id, "Email verified");

    Ok(ApiResponse::ok(
        json!({ "isEmailVerified": user.is_email_verified }),
        "Email is Verified",
    ))
}

pub async fn verify_email_missing_token() -> ApiError {
    ApiError::BadRequest("Email Verification token is missing".to_string())
}

/// Send a new verification link to the caller
///
/// Any earlier verification token stops working.
///
/// # Errors
///
/// - `404 Not Found`: the account no longer exists
/// - `409 Conflict`: the email is already verified
pub async fn resend_email_verification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Value>> {
    let user = User::find_by_id(&state.db, auth.user_id())
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    if user.is_email_verified {
        return Err(ApiError::Conflict("Email is already verified".to_string()));
    }

    let token = generate_temporary_token();
    User::set_email_verification_token(&state.db, user.id, &token).await?;

    let content =
        MailContent::email_verification(&user.username, &state.config.verification_url(&token.unhashed));
    dispatch_email(
        state.mailer.as_ref(),
        EmailMessage::render(&user.email, RESEND_VERIFICATION_SUBJECT, &content, &state.product),
    )
    .await;

    Ok(ApiResponse::ok(empty(), "Mail has been send to your email id"))
}

/// Email a password reset link
///
/// # Errors
///
/// - `400 Bad Request`: "Invalid Email Id" when no account has this email
/// - `422 Unprocessable Entity`: malformed email
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(req): AppJson<ForgotPasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid Email Id".to_string()))?;

    let token = generate_temporary_token();
    User::set_forgot_password_token(&state.db, user.id, &token).await?;

    info!(user_id = %user.id, "Password reset requested");

    let content =
        MailContent::password_reset(&user.username, &state.config.reset_password_url(&token.unhashed));
    dispatch_email(
        state.mailer.as_ref(),
        EmailMessage::render(&user.email, RESET_PASSWORD_SUBJECT, &content, &state.product),
    )
    .await;

    Ok(ApiResponse::ok(empty(), "Password Reset Mail Sent Successfully"))
}

/// Set a new password using a reset token
///
/// Also signs the user out everywhere by clearing the stored refresh token.
///
/// # Errors
///
/// - `400 Bad Request`: "Token is invalid or expired"
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    req.validate()?;

    let user = User::reset_password(&state.db, &hash_token(token.trim()), req.new_password)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Token is invalid or expired".to_string()))?;

    info!(user_id = %user.id, "Password reset");

    Ok(ApiResponse::ok(empty(), "Password Reset Successfully"))
}

/// Change the caller's password
///
/// # Errors
///
/// - `400 Bad Request`: "User not found" or "Invalid old Password"
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    req.validate()?;

    let user = User::find_by_id(&state.db, auth.user_id())
        .await?
        .ok_or_else(|| ApiError::BadRequest("User not found".to_string()))?;

    if !verify_password_async(req.old_password, user.password_hash.clone()).await? {
        return Err(ApiError::BadRequest("Invalid old Password".to_string()));
    }

    User::update_password(&state.db, user.id, req.new_password).await?;

    info!(user_id = %user.id, "Password changed");

    Ok(ApiResponse::ok(empty(), "Password Changed Successfully"))
}
