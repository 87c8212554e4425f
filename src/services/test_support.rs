//! Shared setup for the `#[ignore]`d tests that need a running MongoDB
//! (`DATABASE_URL`, defaults to a local `bikefix_test` database).

use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::UserType;
use crate::services::auth_service::{self, RegisterRequest};

pub async fn live_db() -> MongoDB {
    dotenv::dotenv().ok();
    let uri = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "mongodb://localhost:27017/bikefix_test".to_string());

    MongoDB::new(&uri).await.expect("MongoDB is not reachable")
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@bikefix.test", prefix, uuid::Uuid::new_v4().simple())
}

pub fn register_request(email: &str, user_type: UserType) -> RegisterRequest {
    RegisterRequest {
        name: format!("Test {}", user_type),
        email: email.to_string(),
        password: "secret-123".into(),
        user_type: Some(user_type),
        phone: None,
        address: None,
        workshop_info: None,
    }
}

/// Registers a fresh account and returns the claims of its token
pub async fn register(db: &MongoDB, user_type: UserType) -> Claims {
    let email = unique_email(user_type.as_str());
    let response = auth_service::register(db, &register_request(&email, user_type))
        .await
        .expect("registration failed");

    auth_service::verify_token(&response.token).expect("fresh token must verify")
}
