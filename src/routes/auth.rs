use crate::{
    auth::{slugify, AuthResponse, LoginRequest, PasswordHasher, RegisterRequest, TokenService},
    error::AppError,
    models::{NewUser, UserSummary},
    store::{Store, EMAIL_TAKEN, USERNAME_TAKEN},
};
use actix_web::{get, web, HttpResponse, Responder};
use serde::Deserialize;
use validator::Validate;

/// Register a new user
///
/// Creates an account whose username is the slug of `fullname` and returns an
/// authentication token.
pub async fn register(
    store: web::Data<dyn Store>,
    tokens: web::Data<TokenService>,
    hasher: web::Data<PasswordHasher>,
    register_data: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    register_data.validate()?;
    let RegisterRequest {
        fullname,
        email,
        password,
        repeated_password,
    } = register_data.into_inner();

    if password != repeated_password {
        return Err(AppError::BadRequest("Passwords do not match.".into()));
    }

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest(EMAIL_TAKEN.into()));
    }

    let username = slugify(&fullname);
    if store.find_user_by_username(&username).await?.is_some() {
        return Err(AppError::BadRequest(USERNAME_TAKEN.into()));
    }

    let password_hash = hasher.hash(password).await?;

    // The store re-checks uniqueness, so a concurrent registration still gets a 400.
    let user = store
        .create_user(NewUser {
            username,
            email,
            fullname,
            password_hash,
        })
        .await?;

    let token = tokens.generate(user.id)?;
    log::info!("registered user {} ({})", user.id, user.username);

    Ok(HttpResponse::Created().json(AuthResponse::new(token, &user)))
}

/// Login user
///
/// Authenticates a user by email and password. Unknown emails and wrong
/// passwords get the same 401 response.
pub async fn login(
    store: web::Data<dyn Store>,
    tokens: web::Data<TokenService>,
    hasher: web::Data<PasswordHasher>,
    login_data: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    login_data.validate()?;
    let LoginRequest { email, password } = login_data.into_inner();

    let user = match store.find_user_by_email(&email).await? {
        Some(user) => user,
        None => return Err(AppError::Unauthorized("Invalid credentials".into())),
    };

    if !hasher.verify(password, user.password_hash.clone()).await? {
        log::warn!("failed login for user {}", user.id);
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = tokens.generate(user.id)?;
    Ok(HttpResponse::Ok().json(AuthResponse::new(token, &user)))
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

/// Look up a user by email, e.g. to add them to a project.
#[get("/email-check")]
pub async fn email_check(
    store: web::Data<dyn Store>,
    query: web::Query<EmailQuery>,
) -> Result<impl Responder, AppError> {
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email parameter is missing.".into()))?;

    let user = store
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound("No user with this email found.".into()))?;

    Ok(HttpResponse::Ok().json(UserSummary::from(&user)))
}
