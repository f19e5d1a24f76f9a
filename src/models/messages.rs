use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
}

/// Full message row, including the soft-deletion bookkeeping columns.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub text: String,
    pub status: MessageStatus,
    pub hidden_for_all: bool,
    pub hidden_by: Option<Uuid>,
    pub hidden_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Message as read paths return it: joined with the sender's profile,
/// soft-deletion columns already filtered out by the query.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageView {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub sender_name: String,
    pub sender_avatar: Option<String>,
}

/// Acknowledgement for a single sent message. Echoes `client_id` so the
/// client can reconcile its optimistic copy with the server row.
#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    pub id: Uuid,
    pub client_id: String,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

/// Per-item acknowledgement for a batch sync. Items skipped during the
/// batch simply have no receipt.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReceipt {
    pub id: Uuid,
    pub client_id: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}
