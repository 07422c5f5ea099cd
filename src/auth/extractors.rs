use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::error::AppError;

/// Authenticated caller. Rejects requests without a valid access token.
pub struct AuthUser(pub Uuid);

/// Caller that may be anonymous. A present but invalid token is still rejected.
pub struct MaybeUser(pub Option<Uuid>);

fn bearer(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let auth = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("invalid Authorization header".into()))?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("invalid auth scheme".into()))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer(parts)?
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;
        let claims = JwtKeys::from_ref(state).verify_access(token)?;
        Ok(AuthUser(claims.sub))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer(parts)? {
            Some(token) => {
                let claims = JwtKeys::from_ref(state).verify_access(token)?;
                Ok(MaybeUser(Some(claims.sub)))
            }
            None => Ok(MaybeUser(None)),
        }
    }
}
