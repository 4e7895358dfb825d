use actix_web::{get, HttpResponse, Responder};
use serde_json::json;

/// Lists the endpoint groups. Reachable without a token.
#[get("")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "KanMind API",
        "endpoints": {
            "auth": ["/api/auth/register/", "/api/auth/login/"],
            "projects": "/api/projects/",
            "tasks": "/api/tasks/",
            "email-check": "/api/email-check/",
        }
    }))
}
