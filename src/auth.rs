//! Caller identity extraction.
//!
//! Session handling lives in the fronting auth layer; it forwards the
//! authenticated user as an `X-User-Id` header. Handlers take `AuthUser` to
//! require a caller.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
        let user_uuid = raw
            .parse::<Uuid>()
            .map_err(|_| ApiError::Unauthorized("Invalid user identity".to_string()))?;
        Ok(AuthUser(user_uuid))
    }
}
