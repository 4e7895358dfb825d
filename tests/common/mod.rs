#![allow(dead_code)]

use std::sync::Arc;

use actix_http::Request;
use actix_web::body::{self, MessageBody};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::middleware::NormalizePath;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use kanmind::auth::{AuthResponse, PasswordHasher, TokenService};
use kanmind::routes;
use kanmind::store::{MemoryStore, Store};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "password123";

pub fn app_data() -> (
    web::Data<dyn Store>,
    web::Data<TokenService>,
    web::Data<PasswordHasher>,
) {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    (
        web::Data::from(store),
        web::Data::new(TokenService::new(TEST_SECRET, 1)),
        // Lowest cost bcrypt accepts, to keep the suite fast.
        web::Data::new(PasswordHasher::new(4)),
    )
}

/// The full application on a fresh in-memory store.
pub async fn init_app(
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    let (store, tokens, hasher) = app_data();
    test::init_service(
        App::new()
            .app_data(store)
            .app_data(tokens)
            .app_data(hasher)
            .wrap(NormalizePath::trim())
            .configure(routes::app_config),
    )
    .await
}

pub fn authed(req: test::TestRequest, token: &str) -> test::TestRequest {
    req.insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
}

/// Sends `req` and returns the status with the JSON body (`Null` when empty).
///
/// Errors raised by middleware are rendered the way the server would render them.
pub async fn send<S, B>(app: &S, req: test::TestRequest) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, bytes) = match test::try_call_service(app, req.to_request()).await {
        Ok(resp) => {
            let status = resp.status();
            (status, test::read_body(resp).await)
        }
        Err(err) => {
            let resp = err.error_response();
            let status = resp.status();
            let bytes = body::to_bytes(resp.into_body()).await.unwrap_or_default();
            (status, bytes)
        }
    };

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is not JSON")
    };
    (status, json)
}

pub async fn register<S, B>(app: &S, fullname: &str, email: &str) -> AuthResponse
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/register/")
        .set_json(json!({
            "fullname": fullname,
            "email": email,
            "password": PASSWORD,
            "repeated_password": PASSWORD,
        }));
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);
    serde_json::from_value(body).expect("unexpected registration response")
}

/// Creates a project owned by `token`'s user and returns its id.
pub async fn create_project<S, B>(app: &S, token: &str, title: &str, members: &[i32]) -> i32
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = authed(test::TestRequest::post().uri("/api/projects/"), token)
        .set_json(json!({ "title": title, "members": members }));
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "project creation failed: {}", body);
    body["id"].as_i64().expect("project id") as i32
}

/// Creates a task from `payload` and returns the response body.
pub async fn create_task<S, B>(app: &S, token: &str, payload: Value) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = authed(test::TestRequest::post().uri("/api/tasks/"), token).set_json(payload);
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "task creation failed: {}", body);
    body
}
