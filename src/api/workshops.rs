use actix_web::{web, HttpResponse};

use crate::api::failure;
use crate::database::MongoDB;
use crate::models::WorkshopResponse;
use crate::services::workshop_service::{self, WorkshopListResponse, WorkshopQuery};
use crate::utils::parse_object_id;

#[utoipa::path(
    get,
    path = "/api/workshops",
    tag = "Workshops",
    params(WorkshopQuery),
    responses(
        (status = 200, description = "Active workshops, best rated first", body = WorkshopListResponse)
    )
)]
pub async fn list_workshops(db: web::Data<MongoDB>, query: web::Query<WorkshopQuery>) -> HttpResponse {
    log::info!("🔧 GET /workshops - city: {:?}, service: {:?}", query.city, query.service);

    match workshop_service::list_workshops(&db, &query).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => failure("GET /workshops", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/workshops/{id}",
    tag = "Workshops",
    params(("id" = String, Path, description = "Workshop user ID")),
    responses(
        (status = 200, description = "Workshop profile", body = WorkshopResponse),
        (status = 404, description = "Workshop not found")
    )
)]
pub async fn get_workshop(db: web::Data<MongoDB>, path: web::Path<String>) -> HttpResponse {
    log::info!("🔧 GET /workshops/{}", path);

    let workshop_id = match parse_object_id(&path, "workshop") {
        Ok(id) => id,
        Err(e) => return failure("GET /workshops/{id}", e),
    };

    match workshop_service::get_workshop(&db, &workshop_id).await {
        Ok(workshop) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "workshop": workshop
        })),
        Err(e) => failure("GET /workshops/{id}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_invalid_workshop_id_is_400() {
        let db = MongoDB::from_uri("mongodb://127.0.0.1:1/bikefix_test").await.unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .route("/api/workshops/{id}", web::get().to(get_workshop)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/workshops/not-an-id").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid workshop ID");
    }

    #[actix_web::test]
    async fn test_unparseable_query_gets_json_error() {
        let db = MongoDB::from_uri("mongodb://127.0.0.1:1/bikefix_test").await.unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(crate::api::query_config())
                .route("/api/workshops", web::get().to(list_workshops)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/workshops?page=first").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().starts_with("Query deserialize error"));
    }
}
