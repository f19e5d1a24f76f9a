pub mod calls;
pub mod chats;
pub mod messages;

use anyhow::anyhow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Ids arrive as strings inside command payloads; a malformed one is a
/// payload problem, not a lookup miss.
pub(crate) fn parse_uuid(value: &str, field: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::BadRequest(anyhow!("{} must be a valid UUID", field)))
}
