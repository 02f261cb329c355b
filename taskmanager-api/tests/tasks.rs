/// Integration tests for tasks and subtasks
///
/// Require PostgreSQL via `DATABASE_URL`; each test returns early without it.

mod common;

use axum::http::{Method, StatusCode};
use common::{empty_request, json_request, Session, TestContext};
use serde_json::{json, Value};

async fn create_task(ctx: &TestContext, session: &Session, project_id: &str, body: Value) -> Value {
    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            &format!("/api/v1/projects/{}/tasks", project_id),
            Some(&session.access_token),
            body,
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "create task failed: {}", body);
    body["data"]["task"].clone()
}

#[tokio::test]
async fn test_task_lifecycle() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (owner_user, owner) = ctx.signed_in_user().await;
    let (member_user, _) = ctx.signed_in_user().await;
    let project_id = ctx.create_project(&owner, "Tasks").await;
    ctx.add_member(&owner, &project_id, &member_user, "member").await;

    let task = create_task(
        &ctx,
        &owner,
        &project_id,
        json!({
            "title": "Write docs",
            "assignedTo": member_user.id,
            "attachments": [{ "url": "https://files.example.com/a.png", "mimetype": "image/png", "size": 1024 }],
        }),
    )
    .await;

    assert_eq!(task["status"], "todo");
    assert_eq!(task["assignedTo"], member_user.id.to_string());
    assert_eq!(task["assignedBy"], owner_user.id.to_string());
    assert_eq!(task["attachments"][0]["mimetype"], "image/png");

    let task_uri = format!("/api/v1/projects/{}/tasks/{}", project_id, task["id"].as_str().unwrap());

    let (status, body) = ctx
        .send_json(json_request(
            Method::PUT,
            &task_uri,
            Some(&owner.access_token),
            json!({ "status": "in-progress", "assignedTo": null }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["task"]["status"], "in-progress");
    assert!(body["data"]["task"]["assignedTo"].is_null());
    assert!(body["data"]["task"]["assignedBy"].is_null());
    assert_eq!(body["data"]["task"]["title"], "Write docs");

    let (status, body) = ctx
        .send_json(empty_request(
            Method::GET,
            &format!("/api/v1/projects/{}/tasks?status=in-progress", project_id),
            Some(&owner.access_token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = ctx
        .send_json(empty_request(
            Method::GET,
            &format!("/api/v1/projects/{}/tasks?status=done", project_id),
            Some(&owner.access_token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = ctx
        .send_json(empty_request(Method::DELETE, &task_uri, Some(&owner.access_token)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .send_json(empty_request(Method::GET, &task_uri, Some(&owner.access_token)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Task not found");
}

#[tokio::test]
async fn test_blank_task_title_is_rejected() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (_, owner) = ctx.signed_in_user().await;
    let project_id = ctx.create_project(&owner, "Blank titles").await;
    let tasks_uri = format!("/api/v1/projects/{}/tasks", project_id);

    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            &tasks_uri,
            Some(&owner.access_token),
            json!({ "title": "   " }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"][0].get("title").is_some());

    let (status, body) = ctx
        .send_json(empty_request(Method::GET, &tasks_uri, Some(&owner.access_token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let task = create_task(&ctx, &owner, &project_id, json!({ "title": "  Real title  " })).await;
    assert_eq!(task["title"], "Real title");

    let (status, body) = ctx
        .send_json(json_request(
            Method::PUT,
            &format!("{}/{}", tasks_uri, task["id"].as_str().unwrap()),
            Some(&owner.access_token),
            json!({ "title": "   " }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"][0].get("title").is_some());
}

#[tokio::test]
async fn test_assignee_must_be_member() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (_, owner) = ctx.signed_in_user().await;
    let (outsider, _) = ctx.signed_in_user().await;
    let project_id = ctx.create_project(&owner, "Assign").await;

    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            &format!("/api/v1/projects/{}/tasks", project_id),
            Some(&owner.access_token),
            json!({ "title": "Outsourced", "assignedTo": outsider.id }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Assignee is not a member of this project");
}

#[tokio::test]
async fn test_member_reads_but_cannot_write_tasks() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (_, owner) = ctx.signed_in_user().await;
    let (member_user, member) = ctx.signed_in_user().await;
    let project_id = ctx.create_project(&owner, "Readers").await;
    ctx.add_member(&owner, &project_id, &member_user, "member").await;

    let task = create_task(&ctx, &owner, &project_id, json!({ "title": "Read me" })).await;
    let task_uri = format!("/api/v1/projects/{}/tasks/{}", project_id, task["id"].as_str().unwrap());

    let (status, _) = ctx
        .send_json(empty_request(Method::GET, &task_uri, Some(&member.access_token)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .send_json(json_request(
            Method::POST,
            &format!("/api/v1/projects/{}/tasks", project_id),
            Some(&member.access_token),
            json!({ "title": "Sneaky" }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send_json(empty_request(Method::DELETE, &task_uri, Some(&member.access_token)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_task_is_scoped_to_its_project() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (_, owner) = ctx.signed_in_user().await;
    let first = ctx.create_project(&owner, "First").await;
    let second = ctx.create_project(&owner, "Second").await;

    let task = create_task(&ctx, &owner, &first, json!({ "title": "Lives in first" })).await;

    let (status, _) = ctx
        .send_json(empty_request(
            Method::GET,
            &format!("/api/v1/projects/{}/tasks/{}", second, task["id"].as_str().unwrap()),
            Some(&owner.access_token),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subtasks() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (_, owner) = ctx.signed_in_user().await;
    let (member_user, member) = ctx.signed_in_user().await;
    let project_id = ctx.create_project(&owner, "Checklist").await;
    ctx.add_member(&owner, &project_id, &member_user, "member").await;

    let task = create_task(&ctx, &owner, &project_id, json!({ "title": "Release" })).await;
    let task_uri = format!("/api/v1/projects/{}/tasks/{}", project_id, task["id"].as_str().unwrap());

    // Members can add and complete subtasks
    let (status, body) = ctx
        .send_json(json_request(
            Method::POST,
            &format!("{}/subtasks", task_uri),
            Some(&member.access_token),
            json!({ "title": "Tag the build" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["subtask"]["isCompleted"], false);
    let subtask_uri = format!(
        "{}/subtasks/{}",
        task_uri,
        body["data"]["subtask"]["id"].as_str().unwrap()
    );

    let (status, body) = ctx
        .send_json(json_request(
            Method::PUT,
            &subtask_uri,
            Some(&member.access_token),
            json!({ "isCompleted": true }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subtask"]["isCompleted"], true);
    assert_eq!(body["data"]["subtask"]["title"], "Tag the build");

    let (status, body) = ctx
        .send_json(empty_request(Method::GET, &task_uri, Some(&member.access_token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subtasks"].as_array().unwrap().len(), 1);

    // Only task managers delete them
    let (status, _) = ctx
        .send_json(empty_request(Method::DELETE, &subtask_uri, Some(&member.access_token)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send_json(empty_request(Method::DELETE, &subtask_uri, Some(&owner.access_token)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .send_json(empty_request(Method::DELETE, &subtask_uri, Some(&owner.access_token)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Subtask not found");
}
