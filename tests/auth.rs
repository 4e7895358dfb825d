mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{authed, init_app, register, send, PASSWORD};

#[actix_rt::test]
async fn test_register_and_login_flow() {
    let app = init_app().await;

    let registered = register(&app, "Integration User", "integration@example.com").await;
    assert_eq!(registered.fullname, "Integration User");
    assert_eq!(registered.email, "integration@example.com");
    assert!(!registered.token.is_empty());

    // Same email again
    let req = test::TestRequest::post()
        .uri("/api/auth/register/")
        .set_json(json!({
            "fullname": "Someone Else",
            "email": "integration@example.com",
            "password": PASSWORD,
            "repeated_password": PASSWORD,
        }));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already in use.");

    // Login with the alias route and no trailing slash
    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "integration@example.com", "password": PASSWORD }));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], registered.user_id);
    assert_eq!(body["fullname"], "Integration User");

    // The token opens protected routes
    let token = body["token"].as_str().unwrap();
    let (status, body) = send(&app, authed(test::TestRequest::get().uri("/api/projects/"), token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[actix_rt::test]
async fn test_username_is_derived_from_fullname() {
    let app = init_app().await;
    register(&app, "Ada Lovelace", "ada@example.com").await;

    let req = test::TestRequest::post()
        .uri("/api/registration/")
        .set_json(json!({
            "fullname": "ada   LOVELACE",
            "email": "ada.other@example.com",
            "password": PASSWORD,
            "repeated_password": PASSWORD,
        }));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already in use.");
}

#[actix_rt::test]
async fn test_registration_validation() {
    let app = init_app().await;

    let cases = [
        (
            json!({"fullname": "A B", "email": "not-an-email", "password": PASSWORD, "repeated_password": PASSWORD}),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            json!({"fullname": "A B", "email": "ab@example.com", "password": "short", "repeated_password": "short"}),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            json!({"fullname": "A B", "email": "ab@example.com", "password": PASSWORD, "repeated_password": "password124"}),
            StatusCode::BAD_REQUEST,
        ),
        (
            json!({"fullname": "A B", "email": "ab@example.com"}),
            StatusCode::BAD_REQUEST,
        ),
    ];

    for (payload, expected) in cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/register/")
            .set_json(&payload);
        let (status, body) = send(&app, req).await;
        assert_eq!(status, expected, "payload {} gave {}", payload, body);
        assert!(body["error"].is_string());
    }
}

#[actix_rt::test]
async fn test_login_failures_are_indistinguishable() {
    let app = init_app().await;
    register(&app, "Grace Hopper", "grace@example.com").await;

    for payload in [
        json!({ "email": "grace@example.com", "password": "wrong-password" }),
        json!({ "email": "nobody@example.com", "password": PASSWORD }),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/auth/login/")
            .set_json(&payload);
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }
}

#[actix_rt::test]
async fn test_protected_routes_require_token() {
    let app = init_app().await;

    let (status, body) = send(&app, test::TestRequest::get().uri("/api/tasks/")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing token");

    let req = authed(test::TestRequest::get().uri("/api/projects/"), "not.a.jwt");
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Public endpoints stay reachable
    let (status, body) = send(&app, test::TestRequest::get().uri("/api/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "KanMind API");

    let (status, body) = send(&app, test::TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[actix_rt::test]
async fn test_email_check() {
    let app = init_app().await;
    let ada = register(&app, "Ada Lovelace", "ada@example.com").await;

    let req = authed(
        test::TestRequest::get().uri("/api/email-check/?email=ada@example.com"),
        &ada.token,
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "id": ada.user_id, "fullname": "Ada Lovelace", "email": "ada@example.com" })
    );

    let req = authed(
        test::TestRequest::get().uri("/api/email-check/?email=nobody@example.com"),
        &ada.token,
    );
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = authed(test::TestRequest::get().uri("/api/email-check/"), &ada.token);
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email parameter is missing.");
}
