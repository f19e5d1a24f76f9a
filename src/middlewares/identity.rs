use anyhow::anyhow;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller's identity, as vouched for by the gateway in front of this
/// service. Authentication happens upstream; here the header is only
/// required to be present and well formed, and every authorization check
/// downstream is keyed on this id.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Uuid);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(anyhow!("X-User-Id header required")))?;

        let user_id = Uuid::parse_str(raw.trim())
            .map_err(|_| AppError::Unauthorized(anyhow!("X-User-Id must be a valid UUID")))?;

        Ok(Identity(user_id))
    }
}
