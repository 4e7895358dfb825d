mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{authed, create_project, create_task, init_app, register, send};

#[actix_rt::test]
async fn test_create_and_get_task() {
    let app = init_app().await;
    let owner = register(&app, "Olivia Owner", "owner@example.com").await;
    let member = register(&app, "Max Member", "member@example.com").await;
    let project = create_project(&app, &owner.token, "Board", &[member.user_id]).await;

    let task = create_task(
        &app,
        &owner.token,
        json!({
            "project": project,
            "title": "Design login page",
            "description": "Wireframes first",
            "priority": "high",
            "category": "design",
            "assignee_id": member.user_id,
            "reviewer_id": owner.user_id,
            "due_date": "2025-03-01",
        }),
    )
    .await;
    assert_eq!(task["status"], "to-do");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["category"], "design");
    assert_eq!(task["assignee"]["fullname"], "Max Member");
    assert_eq!(task["reviewer"]["id"], owner.user_id);
    assert_eq!(task["due_date"], "2025-03-01");
    assert_eq!(task["comments_count"], 0);

    let uri = format!("/api/tasks/{}/", task["id"]);
    let (status, fetched) = send(&app, authed(test::TestRequest::get().uri(&uri), &member.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, task);
}

#[actix_rt::test]
async fn test_create_task_rules() {
    let app = init_app().await;
    let owner = register(&app, "Olivia Owner", "owner@example.com").await;
    let outsider = register(&app, "Oscar Outsider", "outsider@example.com").await;
    let project = create_project(&app, &owner.token, "Board", &[]).await;

    let cases = [
        (
            &outsider.token,
            json!({ "project": project, "title": "Sneaky" }),
            StatusCode::FORBIDDEN,
        ),
        (
            &owner.token,
            json!({ "project": 9999, "title": "Nowhere" }),
            StatusCode::NOT_FOUND,
        ),
        (
            &owner.token,
            json!({ "project": project, "title": "" }),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            &owner.token,
            json!({ "project": project, "title": "Bad status", "status": "blocked" }),
            StatusCode::BAD_REQUEST,
        ),
        (
            &owner.token,
            json!({ "project": project, "title": "Outsider", "assignee_id": outsider.user_id }),
            StatusCode::BAD_REQUEST,
        ),
    ];

    for (token, payload, expected) in cases {
        let req = authed(test::TestRequest::post().uri("/api/tasks/"), token).set_json(&payload);
        let (status, body) = send(&app, req).await;
        assert_eq!(status, expected, "payload {} gave {}", payload, body);
    }

    let req = authed(test::TestRequest::post().uri("/api/tasks/"), &owner.token).set_json(
        json!({ "project": project, "title": "Review me", "reviewer_id": outsider.user_id }),
    );
    let (_, body) = send(&app, req).await;
    assert_eq!(body["error"], "Reviewer must be a member of the project.");
}

#[actix_rt::test]
async fn test_update_task() {
    let app = init_app().await;
    let owner = register(&app, "Olivia Owner", "owner@example.com").await;
    let member = register(&app, "Max Member", "member@example.com").await;
    let project = create_project(&app, &owner.token, "Board", &[member.user_id]).await;
    let other_project = create_project(&app, &owner.token, "Other", &[]).await;
    let task = create_task(
        &app,
        &owner.token,
        json!({ "project": project, "title": "Draft", "assignee_id": member.user_id }),
    )
    .await;
    let uri = format!("/api/tasks/{}", task["id"]);

    let req = authed(test::TestRequest::patch().uri(&uri), &member.token)
        .set_json(json!({ "status": "in-progress", "category": "writing" }));
    let (status, patched) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["status"], "in-progress");
    assert_eq!(patched["title"], "Draft");
    assert_eq!(patched["assignee"]["id"], member.user_id);
    assert!(patched.get("comments_count").is_none());

    // Explicit null clears the assignee
    let req = authed(test::TestRequest::patch().uri(&uri), &owner.token)
        .set_json(json!({ "assignee_id": null }));
    let (status, patched) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(patched["assignee"].is_null());

    let req = authed(test::TestRequest::patch().uri(&uri), &owner.token)
        .set_json(json!({ "project": other_project }));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Changing the project of a task is not allowed.");

    // PUT needs title and project
    let req = authed(test::TestRequest::put().uri(&uri), &owner.token)
        .set_json(json!({ "status": "done" }));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = authed(test::TestRequest::put().uri(&uri), &owner.token).set_json(json!({
        "project": project,
        "title": "Final",
        "status": "done",
        "priority": "low",
    }));
    let (status, replaced) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["title"], "Final");
    assert_eq!(replaced["status"], "done");
    assert_eq!(replaced["priority"], "low");
    assert_eq!(replaced["category"], "writing");
    assert_eq!(replaced["comments_count"], 0);
}

#[actix_rt::test]
async fn test_list_and_filter_tasks() {
    let app = init_app().await;
    let owner = register(&app, "Olivia Owner", "owner@example.com").await;
    let member = register(&app, "Max Member", "member@example.com").await;
    let outsider = register(&app, "Oscar Outsider", "outsider@example.com").await;
    let project = create_project(&app, &owner.token, "Board", &[member.user_id]).await;
    let private = create_project(&app, &outsider.token, "Private", &[]).await;

    create_task(
        &app,
        &owner.token,
        json!({ "project": project, "title": "Fix Login bug", "priority": "high", "assignee_id": member.user_id }),
    )
    .await;
    create_task(
        &app,
        &owner.token,
        json!({ "project": project, "title": "Write docs", "description": "about LOGIN", "reviewer_id": member.user_id }),
    )
    .await;
    create_task(
        &app,
        &outsider.token,
        json!({ "project": private, "title": "Hidden login work" }),
    )
    .await;

    let titles = |body: &serde_json::Value| -> Vec<String> {
        body.as_array()
            .into_iter()
            .flatten()
            .filter_map(|t| t["title"].as_str().map(str::to_string))
            .collect()
    };

    let (status, body) =
        send(&app, authed(test::TestRequest::get().uri("/api/tasks/?search=login"), &member.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Write docs", "Fix Login bug"]);

    let (_, body) =
        send(&app, authed(test::TestRequest::get().uri("/api/tasks?priority=high"), &member.token)).await;
    assert_eq!(titles(&body), vec!["Fix Login bug"]);

    let uri = format!("/api/tasks?project={}", private);
    let (_, body) = send(&app, authed(test::TestRequest::get().uri(&uri), &member.token)).await;
    assert_eq!(titles(&body), Vec::<String>::new());

    let (_, body) =
        send(&app, authed(test::TestRequest::get().uri("/api/tasks/assigned-to-me/"), &member.token)).await;
    assert_eq!(titles(&body), vec!["Fix Login bug"]);

    let (_, body) =
        send(&app, authed(test::TestRequest::get().uri("/api/tasks/reviewing/"), &member.token)).await;
    assert_eq!(titles(&body), vec!["Write docs"]);

    let (status, _) =
        send(&app, authed(test::TestRequest::get().uri("/api/tasks?status=blocked"), &member.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_delete_task_permissions() {
    let app = init_app().await;
    let owner = register(&app, "Olivia Owner", "owner@example.com").await;
    let assignee = register(&app, "Alex Assignee", "assignee@example.com").await;
    let member = register(&app, "Max Member", "member@example.com").await;
    let project = create_project(
        &app,
        &owner.token,
        "Board",
        &[assignee.user_id, member.user_id],
    )
    .await;

    let first = create_task(
        &app,
        &owner.token,
        json!({ "project": project, "title": "First", "assignee_id": assignee.user_id }),
    )
    .await;
    let second = create_task(&app, &member.token, json!({ "project": project, "title": "Second" })).await;

    let first_uri = format!("/api/tasks/{}/", first["id"]);
    let second_uri = format!("/api/tasks/{}/", second["id"]);

    // A plain member cannot delete, even a task they created
    let (status, _) = send(&app, authed(test::TestRequest::delete().uri(&second_uri), &member.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, authed(test::TestRequest::delete().uri(&first_uri), &assignee.token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, authed(test::TestRequest::delete().uri(&second_uri), &owner.token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, authed(test::TestRequest::get().uri(&first_uri), &owner.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
