use crate::{
    config::JWT_SETTINGS,
    database::{MongoDB, USERS},
    middleware::auth::Claims,
    models::{Address, User, UserResponse, UserType, WorkshopInfo},
    utils::{duplicate_as_bad_request, is_valid_email, normalize_email, require_text, AppError},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

pub const DUPLICATE_EMAIL_MESSAGE: &str = "User already registered with this email";

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub user_type: Option<UserType>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub workshop_info: Option<WorkshopInfo>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

// Generate JWT token
pub fn generate_jwt(user: &User) -> Result<String, AppError> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::Internal("Cannot issue a token for an unsaved user".to_string()))?;

    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_hex(),
        email: user.email.clone(),
        user_type: user.user_type,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(JWT_SETTINGS.expiration_hours)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: JWT_SETTINGS.audience.clone(),
        iss: JWT_SETTINGS.issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SETTINGS.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

// Verify JWT token
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[JWT_SETTINGS.audience.as_str()]);
    validation.set_issuer(&[JWT_SETTINGS.issuer.as_str()]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SETTINGS.secret.as_bytes()),
        &validation,
    )?;

    Ok(data.claims)
}

/// Checks the payload before anything touches the database
pub fn validate_registration(request: &RegisterRequest) -> Result<(String, String, UserType), AppError> {
    let name = require_text(&request.name, "Name")?;

    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(AppError::bad_request("Please provide a valid email"));
    }

    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user_type = request.user_type.unwrap_or(UserType::Cyclist);
    if user_type == UserType::Admin {
        return Err(AppError::bad_request("Admin accounts cannot be self-registered"));
    }

    Ok((name, email, user_type))
}

// User registration
pub async fn register(db: &MongoDB, request: &RegisterRequest) -> Result<AuthResponse, AppError> {
    let (name, email, user_type) = validate_registration(request)?;

    let collection = db.collection::<User>(USERS);

    if collection.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(AppError::bad_request(DUPLICATE_EMAIL_MESSAGE));
    }

    let hashed_password = hash(&request.password, DEFAULT_COST)?;

    let workshop_info = match user_type {
        UserType::Workshop => {
            let mut info = request.workshop_info.clone().unwrap_or_default();
            // rating fields are derived from reviews
            info.rating = 0.0;
            info.review_count = 0;
            Some(info)
        }
        _ => None,
    };

    let now = Utc::now().timestamp();
    let mut new_user = User {
        id: None,
        name,
        email,
        password: hashed_password,
        user_type,
        phone: request.phone.clone().filter(|p| !p.trim().is_empty()),
        address: request.address.clone(),
        is_verified: false,
        is_active: true,
        workshop_info,
        created_at: now,
        updated_at: now,
        last_login: Some(now),
    };

    // a concurrent registration can still trip the unique email index
    let result = collection
        .insert_one(&new_user)
        .await
        .map_err(|e| duplicate_as_bad_request(e, DUPLICATE_EMAIL_MESSAGE))?;
    new_user.id = result.inserted_id.as_object_id();

    let token = generate_jwt(&new_user)?;

    log::info!("✅ User registered successfully: {} ({})", new_user.email, new_user.user_type);

    Ok(AuthResponse {
        success: true,
        message: "User registered successfully".to_string(),
        token,
        user: UserResponse::from(new_user),
    })
}

// User login
pub async fn login(db: &MongoDB, request: &LoginRequest) -> Result<AuthResponse, AppError> {
    let collection = db.collection::<User>(USERS);
    let email = normalize_email(&request.email);

    let user = collection
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    if !verify(&request.password, &user.password)? {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    if !user.is_active {
        return Err(AppError::forbidden("Account is inactive"));
    }

    let now = Utc::now().timestamp();
    if let Some(id) = user.id {
        collection
            .update_one(doc! { "_id": id }, doc! { "$set": { "lastLogin": now } })
            .await?;
    }

    let token = generate_jwt(&user)?;

    Ok(AuthResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: UserResponse::from(user),
    })
}

/// Rejects tokens whose account was deleted (401) or deactivated (403)
pub async fn ensure_active(db: &MongoDB, claims: &Claims) -> Result<(), AppError> {
    let user_id = claims.user_id()?;

    let account = db
        .collection::<Document>(USERS)
        .find_one(doc! { "_id": user_id })
        .projection(doc! { "isActive": 1 })
        .await?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

    if !account.get_bool("isActive").unwrap_or(false) {
        return Err(AppError::forbidden("Account is inactive"));
    }
    Ok(())
}

// Get current user
pub async fn get_current_user(db: &MongoDB, user_id: &ObjectId) -> Result<User, AppError> {
    db.collection::<User>(USERS)
        .find_one(doc! { "_id": user_id })
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(user_type: UserType) -> User {
        let now = Utc::now().timestamp();
        User {
            id: Some(ObjectId::new()),
            name: "Marta".into(),
            email: "marta@bikefix.com".into(),
            password: String::new(),
            user_type,
            phone: None,
            address: None,
            is_verified: false,
            is_active: true,
            workshop_info: None,
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    fn register_request(email: &str, password: &str, user_type: Option<UserType>) -> RegisterRequest {
        RegisterRequest {
            name: "Marta".into(),
            email: email.into(),
            password: password.into(),
            user_type,
            phone: None,
            address: None,
            workshop_info: None,
        }
    }

    #[test]
    fn test_jwt_roundtrip_keeps_identity() {
        let u = user(UserType::Workshop);
        let token = generate_jwt(&u).unwrap();
        let claims = verify_token(&token).unwrap();

        assert_eq!(claims.sub, u.id.unwrap().to_hex());
        assert_eq!(claims.user_type, UserType::Workshop);
        assert_eq!(claims.aud, JWT_SETTINGS.audience);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let token = generate_jwt(&user(UserType::Cyclist)).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(verify_token(&tampered), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: ObjectId::new().to_hex(),
            email: "x@y.com".into(),
            user_type: UserType::Admin,
            iat: now,
            exp: now + 3600,
            jti: "t".into(),
            aud: JWT_SETTINGS.audience.clone(),
            iss: JWT_SETTINGS.issuer.clone(),
        };
        let forged = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"attacker")).unwrap();
        assert!(verify_token(&forged).is_err());
    }

    #[test]
    fn test_unsaved_user_gets_no_token() {
        let mut u = user(UserType::Cyclist);
        u.id = None;
        assert!(generate_jwt(&u).is_err());
    }

    #[test]
    fn test_validate_registration() {
        let (name, email, kind) =
            validate_registration(&register_request(" Ana@Mail.com ", "secret1", None)).unwrap();
        assert_eq!(name, "Marta");
        assert_eq!(email, "ana@mail.com");
        assert_eq!(kind, UserType::Cyclist);

        assert!(validate_registration(&register_request("bad-email", "secret1", None)).is_err());
        assert!(validate_registration(&register_request("a@b.com", "123", None)).is_err());
        assert!(validate_registration(&register_request("a@b.com", "secret1", Some(UserType::Admin))).is_err());

        let (_, _, kind) =
            validate_registration(&register_request("t@b.com", "secret1", Some(UserType::Workshop))).unwrap();
        assert_eq!(kind, UserType::Workshop);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_concurrent_registrations_with_one_email() {
        use crate::services::test_support;
        use actix_web::ResponseError;

        let db = test_support::live_db().await;
        let email = test_support::unique_email("race");
        let request = test_support::register_request(&email, UserType::Cyclist);

        let (first, second) = tokio::join!(register(&db, &request), register(&db, &request));
        let results = [first, second];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let err = results.into_iter().find_map(Result::err).unwrap();
        assert_eq!(err.status_code(), actix_web::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), DUPLICATE_EMAIL_MESSAGE);
    }
}
