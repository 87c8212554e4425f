use actix_web::{web, HttpResponse};

use crate::api::failure;
use crate::middleware::auth::Claims;
use crate::models::UserResponse;
use crate::services::auth_service::{self, AuthResponse, LoginRequest, RegisterRequest};
use crate::{database::MongoDB, utils::AppError};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is inactive")
    )
)]
pub async fn login(db: web::Data<MongoDB>, request: web::Json<LoginRequest>) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&db, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", response.user.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => failure(&format!("Login failed: {}", request.email), e),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid request or user already exists")
    )
)]
pub async fn register(db: web::Data<MongoDB>, request: web::Json<RegisterRequest>) -> HttpResponse {
    log::info!("📝 POST /auth/register - email: {}", request.email);

    match auth_service::register(&db, &request).await {
        Ok(response) => HttpResponse::Created().json(response),
        Err(e) => failure(&format!("Registration failed: {}", request.email), e),
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_me(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("👤 GET /auth/me - user: {}", user.sub);

    let user_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return failure("GET /auth/me", e),
    };

    match auth_service::get_current_user(&db, &user_id).await {
        Ok(found) if !found.is_active => failure("GET /auth/me", AppError::forbidden("Account is inactive")),
        Ok(found) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": UserResponse::from(found)
        })),
        Err(e) => failure("GET /auth/me", e),
    }
}
