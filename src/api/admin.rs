use actix_web::{web, HttpResponse};

use crate::api::failure;
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::UserResponse;
use crate::services::admin_service::{self, UserStatusRequest, VerifyUserRequest};

#[utoipa::path(
    put,
    path = "/api/admin/verify-user",
    tag = "Admin",
    request_body = VerifyUserRequest,
    responses(
        (status = 200, description = "Verification flag updated", body = UserResponse),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn verify_user(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<VerifyUserRequest>,
) -> HttpResponse {
    log::info!("🛡️  PUT /admin/verify-user - target: {}, by: {}", body.user_id, user.sub);

    match admin_service::verify_user(&db, &user, &body).await {
        Ok(updated) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": if updated.is_verified { "User verified" } else { "User unverified" },
            "user": updated
        })),
        Err(e) => failure("PUT /admin/verify-user", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/admin/user-status",
    tag = "Admin",
    request_body = UserStatusRequest,
    responses(
        (status = 200, description = "Account activated or deactivated", body = UserResponse),
        (status = 403, description = "Admin access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_user_status(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<UserStatusRequest>,
) -> HttpResponse {
    log::info!("🛡️  PUT /admin/user-status - target: {}, active: {}", body.user_id, body.is_active);

    match admin_service::set_user_active(&db, &user, &body).await {
        Ok(updated) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": updated
        })),
        Err(e) => failure("PUT /admin/user-status", e),
    }
}
