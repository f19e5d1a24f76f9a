use serde::Serialize;
use uuid::Uuid;

/// Public slice of a user row, safe to embed in chat and call responses.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub phone: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub online: bool,
}
