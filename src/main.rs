mod api;
mod config;
mod database;
mod jobs;
mod middleware;
mod models;
mod seeds;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::auth::AuthMiddleware;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = config::AppConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    log::info!("🚲 Starting BikeFix API...");
    log::info!("🔑 JWT issuer: {}, audience: {}", config::JWT_SETTINGS.issuer, config::JWT_SETTINGS.audience);

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&config.database_url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Failed to connect to MongoDB: {}", e)))?;

    let db_data = web::Data::new(db.clone());

    log::info!("✅ MongoDB connected successfully");

    if config.seed_demo_workshops {
        seeds::workshops_seed::seed_demo_workshops(&db).await;
    }

    log::info!("📅 Starting background jobs...");
    jobs::appointment_expiry::start_appointment_expiry_job(db.clone(), config.appointment_expiry_interval_secs);

    log::info!("🌐 Server starting on {}:{}", config.host, config.port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", config.host, config.port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", config.host, config.port);

    let cors_origins = config.cors_origins.clone();

    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(api::json_config())
            .app_data(api::query_config())
            .app_data(api::path_config())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(middleware::RequestMetrics)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            .route("/health", web::get().to(api::health::health_check))
            .route("/metrics", web::get().to(api::metrics::get_metrics))

            // Auth: register/login are public, /me needs a token
            .service(
                web::scope("/api/auth")
                    .route("/register", web::post().to(api::auth::register))
                    .route("/login", web::post().to(api::auth::login))
                    .service(
                        web::resource("/me")
                            .wrap(AuthMiddleware)
                            .route(web::get().to(api::auth::get_me))
                    )
            )

            // Profile and bikes
            .service(
                web::scope("/api/users")
                    .wrap(AuthMiddleware)
                    .route("/profile", web::get().to(api::users::get_profile))
                    .route("/profile", web::put().to(api::users::update_profile))
                    .route("/bikes", web::get().to(api::users::list_bikes))
                    .route("/bikes", web::post().to(api::users::add_bike))
                    .route("/bikes/{id}", web::put().to(api::users::update_bike))
                    .route("/bikes/{id}", web::delete().to(api::users::delete_bike))
            )

            // Workshop catalog (public)
            .service(
                web::scope("/api/workshops")
                    .route("", web::get().to(api::workshops::list_workshops))
                    .route("/{id}", web::get().to(api::workshops::get_workshop))
            )

            // Appointments
            .service(
                web::scope("/api/appointments")
                    .wrap(AuthMiddleware)
                    .route("", web::post().to(api::appointments::create_appointment))
                    .route("", web::get().to(api::appointments::list_appointments))
                    .route("/{id}", web::get().to(api::appointments::get_appointment))
                    .route("/{id}/status", web::put().to(api::appointments::update_status))
            )

            // Reviews: listing a workshop's reviews is public, everything else needs a token
            .service(
                web::scope("/api/reviews")
                    .route("/workshop/{id}", web::get().to(api::reviews::workshop_reviews))
                    .service(
                        web::resource("")
                            .wrap(AuthMiddleware)
                            .route(web::post().to(api::reviews::create_review))
                    )
                    .service(
                        web::resource("/my-reviews")
                            .wrap(AuthMiddleware)
                            .route(web::get().to(api::reviews::my_reviews))
                    )
                    .service(
                        web::resource("/stats")
                            .wrap(AuthMiddleware)
                            .route(web::get().to(api::reviews::review_stats))
                    )
                    .service(
                        web::resource("/{id}/respond")
                            .wrap(AuthMiddleware)
                            .route(web::post().to(api::reviews::respond))
                    )
                    .service(
                        web::resource("/{id}/vote")
                            .wrap(AuthMiddleware)
                            .route(web::post().to(api::reviews::vote))
                    )
                    .service(
                        web::resource("/{id}/report")
                            .wrap(AuthMiddleware)
                            .route(web::post().to(api::reviews::report))
                    )
            )

            // Admin
            .service(
                web::scope("/api/admin")
                    .wrap(AuthMiddleware)
                    .route("/verify-user", web::put().to(api::admin::verify_user))
                    .route("/user-status", web::put().to(api::admin::set_user_status))
            )
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
