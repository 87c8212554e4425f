use actix_web::{web, HttpResponse};

use crate::api::failure;
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{AppointmentQuery, AppointmentResponse, CreateAppointmentRequest, UpdateAppointmentStatusRequest};
use crate::services::appointment_service;
use crate::utils::parse_object_id;

#[utoipa::path(
    post,
    path = "/api/appointments",
    tag = "Appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment requested", body = AppointmentResponse),
        (status = 400, description = "No registered bikes, past date or invalid fields"),
        (status = 403, description = "Only cyclists can book"),
        (status = 404, description = "Workshop not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_appointment(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<CreateAppointmentRequest>,
) -> HttpResponse {
    log::info!(
        "📅 POST /appointments - user: {}, workshop: {}, date: {} {}",
        user.sub,
        body.workshop_id,
        body.appointment_date,
        body.appointment_time
    );

    match appointment_service::create_appointment(&db, &user, &body).await {
        Ok(appointment) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "message": "Appointment requested successfully",
            "appointment": AppointmentResponse::from(appointment)
        })),
        Err(e) => failure(&format!("POST /appointments - user: {}", user.sub), e),
    }
}

#[utoipa::path(
    get,
    path = "/api/appointments",
    tag = "Appointments",
    params(AppointmentQuery),
    responses(
        (status = 200, description = "Appointments of the caller, newest first", body = [AppointmentResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_appointments(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    query: web::Query<AppointmentQuery>,
) -> HttpResponse {
    log::info!("📋 GET /appointments - user: {} ({})", user.sub, user.user_type);

    match appointment_service::list_appointments(&db, &user, &query).await {
        Ok(appointments) => {
            let appointments: Vec<AppointmentResponse> =
                appointments.into_iter().map(AppointmentResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "total": appointments.len(),
                "appointments": appointments
            }))
        }
        Err(e) => failure("GET /appointments", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    tag = "Appointments",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment", body = AppointmentResponse),
        (status = 403, description = "Caller is not part of the appointment"),
        (status = 404, description = "Appointment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_appointment(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> HttpResponse {
    log::info!("📋 GET /appointments/{} - user: {}", path, user.sub);

    let appointment_id = match parse_object_id(&path, "appointment") {
        Ok(id) => id,
        Err(e) => return failure("GET /appointments/{id}", e),
    };

    match appointment_service::get_appointment(&db, &user, &appointment_id).await {
        Ok(appointment) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "appointment": AppointmentResponse::from(appointment)
        })),
        Err(e) => failure("GET /appointments/{id}", e),
    }
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}/status",
    tag = "Appointments",
    params(("id" = String, Path, description = "Appointment ID")),
    request_body = UpdateAppointmentStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = AppointmentResponse),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Caller may not perform this change")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_status(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateAppointmentStatusRequest>,
) -> HttpResponse {
    log::info!("🔄 PUT /appointments/{}/status -> {} - user: {}", path, body.status, user.sub);

    let appointment_id = match parse_object_id(&path, "appointment") {
        Ok(id) => id,
        Err(e) => return failure("PUT /appointments/{id}/status", e),
    };

    match appointment_service::update_status(&db, &user, &appointment_id, &body).await {
        Ok(appointment) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": format!("Appointment {}", appointment.status),
            "appointment": AppointmentResponse::from(appointment)
        })),
        Err(e) => failure("PUT /appointments/{id}/status", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::AuthMiddleware;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_booking_requires_token() {
        let db = MongoDB::from_uri("mongodb://127.0.0.1:1/bikefix_test").await.unwrap();
        let app = test::init_service(
            App::new().app_data(web::Data::new(db)).service(
                web::scope("/api/appointments")
                    .wrap(AuthMiddleware)
                    .route("", web::post().to(create_appointment)),
            ),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/appointments")
            .set_json(serde_json::json!({
                "workshopId": "65f000000000000000000001",
                "appointmentDate": "2030-01-01",
                "appointmentTime": "10:00"
            }))
            .to_request();

        let status = match test::try_call_service(&app, req).await {
            Ok(resp) => resp.status(),
            Err(e) => e.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
