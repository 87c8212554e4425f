use crate::{
    database::{MongoDB, USERS},
    middleware::auth::Claims,
    models::{User, UserResponse},
    utils::{parse_object_id, AppError},
};
use mongodb::bson::doc;
use mongodb::options::ReturnDocument;
use serde::Deserialize;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyUserRequest {
    pub user_id: String,
    #[serde(default = "default_true")]
    pub is_verified: bool,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusRequest {
    pub user_id: String,
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn require_admin(claims: &Claims) -> Result<(), AppError> {
    if !claims.is_admin() {
        return Err(AppError::forbidden("Admin access required"));
    }
    Ok(())
}

async fn set_flag(db: &MongoDB, user_id: &str, field: &str, value: bool) -> Result<UserResponse, AppError> {
    let user_id = parse_object_id(user_id, "user")?;

    let user = db
        .collection::<User>(USERS)
        .find_one_and_update(
            doc! { "_id": user_id },
            doc! { "$set": { field: value, "updatedAt": chrono::Utc::now().timestamp() } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(UserResponse::from(user))
}

pub async fn verify_user(db: &MongoDB, claims: &Claims, request: &VerifyUserRequest) -> Result<UserResponse, AppError> {
    require_admin(claims)?;
    let user = set_flag(db, &request.user_id, "isVerified", request.is_verified).await?;
    log::info!("🛡️  {} set isVerified={} on {}", claims.email, request.is_verified, user.email);
    Ok(user)
}

pub async fn set_user_active(db: &MongoDB, claims: &Claims, request: &UserStatusRequest) -> Result<UserResponse, AppError> {
    require_admin(claims)?;
    if claims.sub == request.user_id && !request.is_active {
        return Err(AppError::bad_request("Admins cannot deactivate themselves"));
    }
    let user = set_flag(db, &request.user_id, "isActive", request.is_active).await?;
    log::info!("🛡️  {} set isActive={} on {}", claims.email, request.is_active, user.email);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserType;

    fn claims(user_type: UserType) -> Claims {
        Claims {
            sub: "65f000000000000000000001".into(),
            email: "root@bikefix.com".into(),
            user_type,
            iat: 0,
            exp: 0,
            jti: "j".into(),
            aud: "a".into(),
            iss: "i".into(),
        }
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&claims(UserType::Admin)).is_ok());
        assert!(matches!(require_admin(&claims(UserType::Workshop)), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_verify_request_defaults_to_verified() {
        let req: VerifyUserRequest = serde_json::from_str(r#"{"userId":"abc"}"#).unwrap();
        assert!(req.is_verified);
    }
}
