use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::services::Actor;
use crate::utils::error::AppError;

/// Caller identity, set by the authenticating proxy in front of the API.
pub const USER_ID_HEADER: &str = "x-user-id";
/// `admin` for administrators; anything else or absent is a regular user.
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::AuthError("missing user identity".to_string()))?;
        let user_id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| AppError::AuthError("malformed user identity".to_string()))?;

        let is_admin = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|role| role.trim().eq_ignore_ascii_case("admin"))
            .unwrap_or(false);

        Ok(Actor { user_id, is_admin })
    }
}
