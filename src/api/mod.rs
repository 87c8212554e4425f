pub mod admin;
pub mod appointments;
pub mod auth;
pub mod health;
pub mod metrics;
pub mod reviews;
pub mod swagger;
pub mod users;
pub mod workshops;

use actix_web::{web, HttpResponse, ResponseError};

use crate::utils::AppError;

/// Logs a failed request and renders the error body
pub(crate) fn failure(context: &str, err: AppError) -> HttpResponse {
    if err.is_server_error() {
        log::error!("❌ {} - {}", context, err);
    } else {
        log::warn!("❌ {} - {}", context, err);
    }
    err.error_response()
}

/// JSON bodies that fail to parse answer with the same `{success:false,message}` body
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        log::warn!("❌ Rejected body on {} - {}", req.path(), err);
        AppError::bad_request(err.to_string()).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, req| {
        log::warn!("❌ Rejected query on {} - {}", req.path(), err);
        AppError::bad_request(err.to_string()).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, req| {
        log::warn!("❌ Rejected path {} - {}", req.path(), err);
        AppError::bad_request(err.to_string()).into()
    })
}
