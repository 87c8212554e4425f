use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::database::MongoDB;
use crate::models::UserType;
use crate::services::auth_service;
use crate::utils::AppError;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,           // user _id (hex)
    pub email: String,
    pub user_type: UserType,
    pub iat: usize,            // issued at
    pub exp: usize,            // expiration
    pub jti: String,           // JWT ID
    pub aud: String,           // audience
    pub iss: String,           // issuer
}

impl Claims {
    pub fn user_id(&self) -> Result<ObjectId, AppError> {
        ObjectId::parse_str(&self.sub).map_err(|_| AppError::unauthorized("Invalid token subject"))
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verifies the bearer JWT, checks the account is still active and stores
/// its `Claims` in the request extensions, handlers read them through
/// `web::ReqData<Claims>`
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let header = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match header {
            Some(value) => match bearer_token(value) {
                Some(token) => token.to_string(),
                None => {
                    return Box::pin(async move {
                        Err(AppError::unauthorized("Invalid token format").into())
                    });
                }
            },
            None => {
                return Box::pin(async move {
                    Err(AppError::unauthorized("No token provided, authorization denied").into())
                });
            }
        };

        let claims = match auth_service::verify_token(&token) {
            Ok(claims) => claims,
            Err(e) => {
                log::warn!("🔒 Rejected token on {}: {}", req.path(), e);
                return Box::pin(async move { Err(AppError::unauthorized("Token is not valid").into()) });
            }
        };

        let db = req.app_data::<web::Data<MongoDB>>().cloned();
        let srv = Rc::clone(&self.service);

        Box::pin(async move {
            let db = db.ok_or_else(|| AppError::Internal("MongoDB handle is not registered".to_string()))?;

            if let Err(e) = auth_service::ensure_active(&db, &claims).await {
                log::warn!("🔒 Rejected {} on {}: {}", claims.sub, req.path(), e);
                return Err(e.into());
            }

            req.extensions_mut().insert(claims);
            let res = srv.call(req).await?;
            Ok(res)
        })
    }
}
