use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "call_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    #[default]
    Voice,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "call_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Ringing,
    Active,
    Ended,
    Rejected,
    Cancelled,
}

impl CallStatus {
    /// A live call still occupies its participants; anything else is history.
    pub fn is_live(self) -> bool {
        matches!(self, CallStatus::Ringing | CallStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Call {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub caller_id: Uuid,
    pub callee_id: Uuid,
    pub call_type: CallType,
    pub status: CallStatus,
    pub sdp_offer: String,
    pub sdp_answer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Call as poll returns it, joined with the other party's profile.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CallView {
    pub id: Uuid,
    pub caller_id: Uuid,
    pub callee_id: Uuid,
    pub chat_id: Uuid,
    pub call_type: CallType,
    pub status: CallStatus,
    pub sdp_offer: String,
    pub sdp_answer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub peer_name: String,
    pub peer_avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IceCandidate {
    pub id: Uuid,
    pub call_id: Uuid,
    pub sender_id: Uuid,
    pub candidate: String,
    pub created_at: DateTime<Utc>,
}

/// ICE candidate as poll relays it to the other party. The candidate body
/// is passed through untouched; only the peer connection interprets it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IcePayload {
    pub id: Uuid,
    pub candidate: String,
}

/// Acknowledgement for a freshly initiated call.
#[derive(Debug, Clone, Serialize)]
pub struct CallReceipt {
    pub call_id: Uuid,
    pub created_at: DateTime<Utc>,
}
