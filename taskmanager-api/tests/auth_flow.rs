/// Integration tests for the authentication endpoints
///
/// Require PostgreSQL via `DATABASE_URL`; each test returns early without it.
///
/// cargo test -p taskmanager-api --test auth_flow

mod common;

use axum::http::{header, Method, StatusCode};
use common::{empty_request, json_request, TestContext};
use serde_json::json;
use taskmanager_shared::models::user::User;

#[tokio::test]
async fn test_register_creates_unverified_user_and_sends_email() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let user = ctx.register_user().await;

    let stored = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert!(!stored.is_email_verified);
    assert_ne!(stored.password_hash, user.password);
    assert!(stored.email_verification_token.is_some());

    let message = ctx.mailer.last_to(&user.email).unwrap();
    assert_eq!(message.subject, "Please verify your email");
    assert!(message.text.contains("/api/v1/auth/verify-email/"));
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let user = ctx.register_user().await;

    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            json!({
                "email": user.email,
                "username": "someoneelse",
                "password": "Password@1",
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User with email or username already exist");
}

#[tokio::test]
async fn test_register_rejects_overlong_username() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            json!({
                "email": "long-name@example.com",
                "username": "a".repeat(65),
                "password": "Password@1",
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"][0]["username"],
        "Username must be at most 64 characters long"
    );
    assert!(User::find_by_email(&ctx.db, "long-name@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_login_failures() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({ "email": "unknown@x.com", "password": "x" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User does not exists");

    let user = ctx.register_user().await;
    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({ "email": user.email, "password": "Wrong@Password1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Credentials");
}

#[tokio::test]
async fn test_login_sets_cookies_and_current_user_works() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let user = ctx.register_user().await;
    let response = ctx
        .send(json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({ "email": user.email, "password": user.password }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let access_cookie = cookies
        .iter()
        .find(|c| c.starts_with("accessToken="))
        .and_then(|c| c.split(';').next())
        .unwrap()
        .to_string();

    // Cookie alone is enough to authenticate
    let request = axum::extract::Request::builder()
        .uri("/api/v1/auth/current-user")
        .header(header::COOKIE, access_cookie)
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = ctx.send_json(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Current User Fetched");
    assert_eq!(body["data"]["email"], user.email);
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("refreshToken").is_none());
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (_, session) = ctx.signed_in_user().await;

    let refresh = |token: &str| {
        json_request(
            Method::POST,
            "/api/v1/auth/refresh-token",
            None,
            json!({ "refreshToken": token }),
        )
    };

    let (status, body) = ctx.send_json(refresh(&session.refresh_token)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Access Token Generated Successfully");
    let rotated = body["data"]["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(rotated, session.refresh_token);

    // The old token is rotated out
    let (status, body) = ctx.send_json(refresh(&session.refresh_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Refresh token is expired");

    // The new one works exactly once
    let (status, _) = ctx.send_json(refresh(&rotated)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx.send_json(refresh(&rotated)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_garbage_token() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/refresh-token",
            None,
            json!({ "refreshToken": "not-a-token" }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid refresh token");
}

#[tokio::test]
async fn test_logout_invalidates_refresh_token() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (user, session) = ctx.signed_in_user().await;

    let response = ctx
        .send(empty_request(
            Method::POST,
            "/api/v1/auth/logout",
            Some(&session.access_token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .all(|v| v.to_str().unwrap().contains("Max-Age=0")));

    let stored = User::find_by_id(&ctx.db, user.id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());

    let (status, _) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/refresh-token",
            None,
            json!({ "refreshToken": session.refresh_token }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_email_token_is_single_use() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let user = ctx.register_user().await;
    let token = ctx.token_from_last_email(&user.email, "verify-email/");
    assert_eq!(token.len(), 40);

    let uri = format!("/api/v1/auth/verify-email/{}", token);

    let (status, body) = ctx.send_json(empty_request(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isEmailVerified"], true);

    let (status, body) = ctx.send_json(empty_request(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Token is invalid or expired");
}

#[tokio::test]
async fn test_resend_verification() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (user, session) = ctx.signed_in_user().await;
    let first = ctx.token_from_last_email(&user.email, "verify-email/");

    let (status, body) = ctx
        .send_json(empty_request(
            Method::POST,
            "/api/v1/auth/resend-email-verification",
            Some(&session.access_token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Mail has been send to your email id");

    let message = ctx.mailer.last_to(&user.email).unwrap();
    assert_eq!(message.subject, "Resending Verification Email");

    // The earlier link no longer works, the new one does
    let second = ctx.token_from_last_email(&user.email, "verify-email/");
    let (status, _) = ctx
        .send_json(empty_request(
            Method::GET,
            &format!("/api/v1/auth/verify-email/{}", first),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .send_json(empty_request(
            Method::GET,
            &format!("/api/v1/auth/verify-email/{}", second),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .send_json(empty_request(
            Method::POST,
            "/api/v1/auth/resend-email-verification",
            Some(&session.access_token),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email is already verified");
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (user, session) = ctx.signed_in_user().await;

    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/forgot-password",
            None,
            json!({ "email": "nobody@example.com" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Email Id");

    let (status, _) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/forgot-password",
            None,
            json!({ "email": user.email }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let message = ctx.mailer.last_to(&user.email).unwrap();
    assert_eq!(message.subject, "Reset Your Account Password");
    let token = ctx.token_from_last_email(&user.email, "reset-password/");

    let uri = format!("/api/v1/auth/reset-password/{}", token);
    let reset = || {
        json_request(
            Method::POST,
            &uri,
            None,
            json!({ "newPassword": "Brand@NewPass1" }),
        )
    };

    let (status, body) = ctx.send_json(reset()).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Password Reset Successfully");

    let (status, body) = ctx.send_json(reset()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Token is invalid or expired");

    // Reset signs the user out everywhere
    let (status, _) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/refresh-token",
            None,
            json!({ "refreshToken": session.refresh_token }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut updated = user.clone();
    updated.password = "Brand@NewPass1".to_string();
    ctx.login(&updated).await;
}

#[tokio::test]
async fn test_change_password() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (user, session) = ctx.signed_in_user().await;

    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/change-password",
            Some(&session.access_token),
            json!({ "oldPassword": "Wrong@Pass1", "newPassword": "Another@Pass1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid old Password");

    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/change-password",
            Some(&session.access_token),
            json!({ "oldPassword": user.password, "newPassword": "weak" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0].as_object().unwrap().keys().next().unwrap(), "newPassword");

    let (status, _) = ctx
        .send_json(json_request(
            Method::POST,
            "/api/v1/auth/change-password",
            Some(&session.access_token),
            json!({ "oldPassword": user.password, "newPassword": "Another@Pass1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let mut updated = user.clone();
    updated.password = "Another@Pass1".to_string();
    ctx.login(&updated).await;
}
