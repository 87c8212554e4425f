use actix_web::{web, HttpResponse};

use crate::api::failure;
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{BikeResponse, CreateBikeRequest, UpdateBikeRequest, UpdateProfileRequest, UserResponse};
use crate::services::user_service;
use crate::utils::parse_object_id;

// ==================== PROFILE ====================

#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "Users",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("👤 GET /users/profile - user: {}", user.sub);

    match user_service::get_profile(&db, &user).await {
        Ok(profile) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": profile
        })),
        Err(e) => failure("GET /users/profile", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/users/profile",
    tag = "Users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid fields")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    log::info!("✏️  PUT /users/profile - user: {}", user.sub);

    match user_service::update_profile(&db, &user, &body).await {
        Ok(profile) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Profile updated successfully",
            "user": profile
        })),
        Err(e) => failure("PUT /users/profile", e),
    }
}

// ==================== BIKES ====================

#[utoipa::path(
    get,
    path = "/api/users/bikes",
    tag = "Bikes",
    responses(
        (status = 200, description = "Active bikes of the cyclist", body = [BikeResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_bikes(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("🚲 GET /users/bikes - user: {}", user.sub);

    let owner_id = match user.user_id() {
        Ok(id) => id,
        Err(e) => return failure("GET /users/bikes", e),
    };

    match user_service::list_bikes(&db, &owner_id).await {
        Ok(bikes) => {
            let bikes: Vec<BikeResponse> = bikes.into_iter().map(BikeResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "total": bikes.len(),
                "bikes": bikes
            }))
        }
        Err(e) => failure("GET /users/bikes", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/users/bikes",
    tag = "Bikes",
    request_body = CreateBikeRequest,
    responses(
        (status = 201, description = "Bike registered", body = BikeResponse),
        (status = 400, description = "Invalid bike data or duplicate serial number"),
        (status = 403, description = "Only cyclists can register bikes")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_bike(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<CreateBikeRequest>,
) -> HttpResponse {
    log::info!("➕ POST /users/bikes - user: {}", user.sub);

    match user_service::add_bike(&db, &user, &body).await {
        Ok(bike) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "message": "Bike registered successfully",
            "bike": bike
        })),
        Err(e) => failure("POST /users/bikes", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/users/bikes/{id}",
    tag = "Bikes",
    params(("id" = String, Path, description = "Bike ID")),
    request_body = UpdateBikeRequest,
    responses(
        (status = 200, description = "Bike updated", body = BikeResponse),
        (status = 404, description = "Bike not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_bike(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateBikeRequest>,
) -> HttpResponse {
    log::info!("✏️  PUT /users/bikes/{} - user: {}", path, user.sub);

    let bike_id = match parse_object_id(&path, "bike") {
        Ok(id) => id,
        Err(e) => return failure("PUT /users/bikes", e),
    };

    match user_service::update_bike(&db, &user, &bike_id, &body).await {
        Ok(bike) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "bike": bike
        })),
        Err(e) => failure("PUT /users/bikes", e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/users/bikes/{id}",
    tag = "Bikes",
    params(("id" = String, Path, description = "Bike ID")),
    responses(
        (status = 200, description = "Bike removed"),
        (status = 404, description = "Bike not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_bike(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> HttpResponse {
    log::info!("🗑️  DELETE /users/bikes/{} - user: {}", path, user.sub);

    let bike_id = match parse_object_id(&path, "bike") {
        Ok(id) => id,
        Err(e) => return failure("DELETE /users/bikes", e),
    };

    match user_service::delete_bike(&db, &user, &bike_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Bike removed successfully"
        })),
        Err(e) => failure("DELETE /users/bikes", e),
    }
}
