#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::calls::{CallType, CallView, IcePayload};
use crate::models::chats::ChatOverviewRow;
use crate::models::messages::{Message, MessageStatus, MessageView};
use crate::models::users::UserProfile;

/// One item of a batch sync, after the service has normalized it.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: Uuid,
    pub text: String,
}

/// What the store reports back for a freshly inserted message. Timestamps
/// are store-assigned; callers must not invent their own.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct InsertedMessage {
    pub id: Uuid,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert one message with status `sent`.
    async fn insert_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        text: &str,
    ) -> AppResult<InsertedMessage>;

    /// Insert a batch atomically, preserving item order in the assigned
    /// timestamps. Items whose chat does not exist are skipped and come
    /// back as `None` in the matching slot; the rest still commit.
    async fn insert_messages(
        &self,
        sender_id: Uuid,
        items: &[NewMessage],
    ) -> AppResult<Vec<Option<InsertedMessage>>>;

    async fn get_message(&self, message_id: Uuid) -> AppResult<Option<Message>>;

    /// One chat's history for one requester, oldest first. Drops rows
    /// hidden for everyone and rows the requester hid for themselves,
    /// except that a sender always sees their own messages. Without a
    /// cursor this returns the newest `limit` rows; with a cursor, the
    /// oldest `limit` rows strictly newer than it.
    async fn list_chat_messages(
        &self,
        chat_id: Uuid,
        requester: Uuid,
        after: Option<DateTime<Utc>>,
        limit: i64,
    ) -> AppResult<Vec<MessageView>>;

    /// Messages strictly newer than `after` across every chat the user is
    /// an active member of, oldest first. The user's own messages and
    /// messages hidden for everyone are excluded.
    async fn poll_new_messages(
        &self,
        user_id: Uuid,
        after: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<MessageView>>;

    /// Flip every `sent` message from other senders in the chat to
    /// `delivered`. Returns how many rows changed.
    async fn mark_chat_delivered(&self, chat_id: Uuid, reader: Uuid) -> AppResult<u64>;

    async fn hide_message_for_all(&self, message_id: Uuid) -> AppResult<()>;

    /// Claim the message's single hide-for-me slot for `user_id`. Returns
    /// false when another user already holds it; claiming one's own slot
    /// again is fine.
    async fn hide_message_for_user(&self, message_id: Uuid, user_id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn user_exists(&self, user_id: Uuid) -> AppResult<bool>;

    async fn get_user_profile(&self, user_id: Uuid) -> AppResult<Option<UserProfile>>;

    async fn chat_exists(&self, chat_id: Uuid) -> AppResult<bool>;

    /// Membership with no leave timestamp.
    async fn is_active_member(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Find the 1:1 chat for this pair or create it, atomically against
    /// concurrent creation of the same pair. Both users end up as members
    /// and the requesting user's membership is re-activated if they had
    /// left. Returns the chat id.
    async fn find_or_create_direct_chat(&self, user_id: Uuid, partner_id: Uuid)
        -> AppResult<Uuid>;

    /// Set the leave timestamp if currently null. Zero affected rows is
    /// not an error; leave is idempotent.
    async fn leave_chat(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<u64>;

    /// Per-chat aggregates for the conversation list: direct-chat partner
    /// profile, latest visible message, unread count. Most recent activity
    /// first.
    async fn chat_overviews(&self, user_id: Uuid) -> AppResult<Vec<ChatOverviewRow>>;
}

#[async_trait]
pub trait CallStore: Send + Sync {
    /// Insert a ringing call. In the same transaction, every live call the
    /// caller is party to (either side) is cancelled first; one live call
    /// per user, enforced by preemption.
    async fn create_call(
        &self,
        chat_id: Uuid,
        caller_id: Uuid,
        callee_id: Uuid,
        call_type: CallType,
        sdp_offer: &str,
    ) -> AppResult<(Uuid, DateTime<Utc>)>;

    /// `ringing -> active`, guarded on the callee. Returns affected rows;
    /// zero means no such ringing call for this callee.
    async fn answer_call(&self, call_id: Uuid, callee_id: Uuid, sdp_answer: &str)
        -> AppResult<u64>;

    /// `ringing -> rejected`, guarded on the callee.
    async fn reject_call(&self, call_id: Uuid, callee_id: Uuid) -> AppResult<u64>;

    /// Live call -> `ended`, guarded on either participant.
    async fn end_call(&self, call_id: Uuid, user_id: Uuid) -> AppResult<u64>;

    /// Relay material for an ongoing call. The candidate body is opaque.
    async fn insert_ice_candidate(
        &self,
        call_id: Uuid,
        sender_id: Uuid,
        candidate: &str,
    ) -> AppResult<()>;

    /// The user's single current live call, if any call of theirs is still
    /// ringing or active and younger than `ttl`. Newest wins.
    async fn current_call(&self, user_id: Uuid, ttl: Duration) -> AppResult<Option<CallView>>;

    /// Candidates the other party posted for this call, oldest first.
    async fn ice_candidates_from_peer(
        &self,
        call_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Vec<IcePayload>>;
}

/// Everything the services need from persistence, behind one handle.
pub trait Store: MessageStore + MembershipStore + CallStore {}

impl<T: MessageStore + MembershipStore + CallStore> Store for T {}
