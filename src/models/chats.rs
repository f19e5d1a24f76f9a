use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::users::UserProfile;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Chat {
    pub id: Uuid,
    pub is_group: bool,
    pub name: Option<String>,
    /// Canonical pair key for direct chats, `None` for groups. Unique in
    /// the store, which is what makes find-or-create race safe.
    pub direct_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatMember {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

/// Raw per-chat aggregate as the store computes it. Display fallbacks for
/// nameless chats are applied by the service layer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatOverviewRow {
    pub id: Uuid,
    pub is_group: bool,
    pub name: Option<String>,
    pub partner_id: Option<Uuid>,
    pub partner_name: Option<String>,
    pub partner_avatar: Option<String>,
    pub partner_online: Option<bool>,
    pub last_message: Option<String>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub unread: i64,
}

/// Chat as the conversation list renders it.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOverview {
    pub id: Uuid,
    pub is_group: bool,
    pub name: String,
    pub partner_id: Option<Uuid>,
    pub avatar: String,
    pub online: bool,
    pub last_message: String,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub unread: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectChat {
    pub chat_id: Uuid,
    pub partner: UserProfile,
}

/// Canonical key for the direct chat between two users: the smaller UUID
/// first, so both orderings of the pair map to the same key.
pub fn direct_chat_key(a: Uuid, b: Uuid) -> String {
    if a <= b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}
