use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BikeFix API",
        version = "1.0.0",
        description = "REST API of the BikeFix marketplace connecting cyclists with repair workshops.\n\n**Authentication:** protected endpoints require a JWT Bearer token obtained from `/api/auth/login` or `/api/auth/register`.\n\n**Booking rule:** a cyclist must register at least one bike before requesting an appointment.",
        contact(
            name = "BikeFix Team",
            email = "support@bikefix.app"
        )
    ),
    paths(
        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::get_me,

        // Users & bikes
        crate::api::users::get_profile,
        crate::api::users::update_profile,
        crate::api::users::list_bikes,
        crate::api::users::add_bike,
        crate::api::users::update_bike,
        crate::api::users::delete_bike,

        // Workshops
        crate::api::workshops::list_workshops,
        crate::api::workshops::get_workshop,

        // Appointments
        crate::api::appointments::create_appointment,
        crate::api::appointments::list_appointments,
        crate::api::appointments::get_appointment,
        crate::api::appointments::update_status,

        // Reviews
        crate::api::reviews::create_review,
        crate::api::reviews::workshop_reviews,
        crate::api::reviews::my_reviews,
        crate::api::reviews::review_stats,
        crate::api::reviews::respond,
        crate::api::reviews::vote,
        crate::api::reviews::report,

        // Admin
        crate::api::admin::verify_user,
        crate::api::admin::set_user_status,
    ),
    components(
        schemas(
            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,

            // Auth & users
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::AuthResponse,
            crate::models::UserType,
            crate::models::Address,
            crate::models::OpeningHours,
            crate::models::WorkshopInfo,
            crate::models::UserResponse,
            crate::models::UpdateProfileRequest,
            crate::models::UpdateWorkshopInfo,

            // Bikes
            crate::models::BikeType,
            crate::models::CreateBikeRequest,
            crate::models::UpdateBikeRequest,
            crate::models::BikeResponse,

            // Workshops
            crate::models::WorkshopResponse,
            crate::services::workshop_service::WorkshopListResponse,

            // Appointments
            crate::models::AppointmentStatus,
            crate::models::Urgency,
            crate::models::BikeInfo,
            crate::models::Pricing,
            crate::models::CreateAppointmentRequest,
            crate::models::UpdateAppointmentStatusRequest,
            crate::models::AppointmentResponse,

            // Reviews
            crate::models::ReportReason,
            crate::models::ReviewSort,
            crate::models::WorkshopResponseNote,
            crate::models::CreateReviewRequest,
            crate::models::RespondReviewRequest,
            crate::models::VoteReviewRequest,
            crate::models::ReportReviewRequest,
            crate::models::ReviewResponse,
            crate::models::ReviewStats,
            crate::services::review_service::ReviewPage,

            // Admin
            crate::services::admin_service::VerifyUserRequest,
            crate::services::admin_service::UserStatusRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check and Prometheus counters."),
        (name = "Auth", description = "Registration, login and current-user lookup."),
        (name = "Users", description = "Profile of the authenticated user."),
        (name = "Bikes", description = "Bikes owned by a cyclist. At least one is required to book."),
        (name = "Workshops", description = "Public workshop catalog with city/service/rating filters."),
        (name = "Appointments", description = "Repair appointments between cyclists and workshops."),
        (name = "Reviews", description = "Workshop reviews, responses, helpfulness votes and reports."),
        (name = "Admin", description = "Account verification and activation."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT returned by /api/auth/login"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_booking_and_bike_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/appointments"));
        assert!(doc.paths.paths.contains_key("/api/users/bikes"));
        assert!(doc.paths.paths.contains_key("/api/admin/verify-user"));
    }
}
