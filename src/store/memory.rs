//! In-memory store double for service tests. Mirrors the relational
//! semantics closely enough to exercise every guard and visibility rule
//! without a running database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::calls::{Call, CallStatus, CallType, CallView, IceCandidate, IcePayload};
use crate::models::chats::{direct_chat_key, ChatOverviewRow};
use crate::models::messages::{Message, MessageStatus, MessageView};
use crate::models::users::UserProfile;
use crate::store::{
    CallStore, InsertedMessage, MembershipStore, MessageStore, NewMessage,
};

use anyhow::anyhow;

struct ChatRecord {
    id: Uuid,
    is_group: bool,
}

struct MemberRecord {
    left_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserProfile>,
    chats: HashMap<Uuid, ChatRecord>,
    direct_keys: HashMap<String, Uuid>,
    members: HashMap<(Uuid, Uuid), MemberRecord>,
    messages: Vec<Message>,
    calls: Vec<Call>,
    ice: Vec<IceCandidate>,
    last_ts: Option<DateTime<Utc>>,
    user_seq: u32,
}

impl Inner {
    /// Store-assigned timestamps are strictly increasing so that cursor
    /// comparisons stay a total order even within one batch.
    fn next_ts(&mut self) -> DateTime<Utc> {
        let mut ts = Utc::now();
        if let Some(last) = self.last_ts {
            if ts <= last {
                ts = last + Duration::microseconds(1);
            }
        }
        self.last_ts = Some(ts);
        ts
    }

    fn visible_to(&self, m: &Message, requester: Uuid) -> bool {
        if m.hidden_for_all {
            return false;
        }
        match m.hidden_by {
            Some(hider) => hider != requester || m.sender_id == requester,
            None => true,
        }
    }

    fn view(&self, m: &Message) -> Option<MessageView> {
        let sender = self.users.get(&m.sender_id)?;
        Some(MessageView {
            id: m.id,
            chat_id: m.chat_id,
            sender_id: m.sender_id,
            text: m.text.clone(),
            status: m.status,
            created_at: m.created_at,
            sender_name: sender.display_name.clone(),
            sender_avatar: sender.avatar.clone(),
        })
    }

    fn insert_row(&mut self, chat_id: Uuid, sender_id: Uuid, text: &str) -> InsertedMessage {
        let created_at = self.next_ts();
        let message = Message {
            id: Uuid::new_v4(),
            chat_id,
            sender_id,
            text: text.to_owned(),
            status: MessageStatus::Sent,
            hidden_for_all: false,
            hidden_by: None,
            hidden_at: None,
            created_at,
        };
        let receipt = InsertedMessage {
            id: message.id,
            status: message.status,
            created_at,
        };
        self.messages.push(message);
        receipt
    }
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, display_name: &str) -> Uuid {
        let mut inner = self.inner.lock().unwrap();
        inner.user_seq += 1;
        let user = UserProfile {
            id: Uuid::new_v4(),
            phone: format!("+7900{:07}", inner.user_seq),
            display_name: display_name.to_owned(),
            avatar: None,
            online: false,
        };
        let id = user.id;
        inner.users.insert(id, user);
        id
    }

    pub fn add_group_chat(&self, members: &[Uuid]) -> Uuid {
        let mut inner = self.inner.lock().unwrap();
        let chat_id = Uuid::new_v4();
        inner.chats.insert(
            chat_id,
            ChatRecord {
                id: chat_id,
                is_group: true,
            },
        );
        for &user_id in members {
            inner
                .members
                .insert((chat_id, user_id), MemberRecord { left_at: None });
        }
        chat_id
    }

    /// Shift a message's creation time into the past, for exercising the
    /// deletion window without waiting it out.
    pub fn backdate_message(&self, message_id: Uuid, by: Duration) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(m) = inner.messages.iter_mut().find(|m| m.id == message_id) {
            m.created_at -= by;
        }
    }

    pub fn backdate_call(&self, call_id: Uuid, by: Duration) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(c) = inner.calls.iter_mut().find(|c| c.id == call_id) {
            c.created_at -= by;
        }
    }

    pub fn call_status(&self, call_id: Uuid) -> Option<CallStatus> {
        let inner = self.inner.lock().unwrap();
        inner.calls.iter().find(|c| c.id == call_id).map(|c| c.status)
    }

    pub fn member_left_at(&self, chat_id: Uuid, user_id: Uuid) -> Option<Option<DateTime<Utc>>> {
        let inner = self.inner.lock().unwrap();
        inner
            .members
            .get(&(chat_id, user_id))
            .map(|m| m.left_at)
    }
}

#[async_trait]
impl MessageStore for MemStore {
    async fn insert_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        text: &str,
    ) -> AppResult<InsertedMessage> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.insert_row(chat_id, sender_id, text))
    }

    async fn insert_messages(
        &self,
        sender_id: Uuid,
        items: &[NewMessage],
    ) -> AppResult<Vec<Option<InsertedMessage>>> {
        let mut inner = self.inner.lock().unwrap();
        let mut receipts = Vec::with_capacity(items.len());
        for item in items {
            if !inner.chats.contains_key(&item.chat_id) {
                receipts.push(None);
                continue;
            }
            receipts.push(Some(inner.insert_row(item.chat_id, sender_id, &item.text)));
        }
        Ok(receipts)
    }

    async fn get_message(&self, message_id: Uuid) -> AppResult<Option<Message>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.messages.iter().find(|m| m.id == message_id).cloned())
    }

    async fn list_chat_messages(
        &self,
        chat_id: Uuid,
        requester: Uuid,
        after: Option<DateTime<Utc>>,
        limit: i64,
    ) -> AppResult<Vec<MessageView>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<&Message> = inner
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id && inner.visible_to(m, requester))
            .collect();
        rows.sort_by_key(|m| m.created_at);

        let limit = limit.max(0) as usize;
        let selected: Vec<&Message> = match after {
            Some(cursor) => rows
                .into_iter()
                .filter(|m| m.created_at > cursor)
                .take(limit)
                .collect(),
            None => {
                let skip = rows.len().saturating_sub(limit);
                rows.into_iter().skip(skip).collect()
            }
        };

        Ok(selected.into_iter().filter_map(|m| inner.view(m)).collect())
    }

    async fn poll_new_messages(
        &self,
        user_id: Uuid,
        after: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<MessageView>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<&Message> = inner
            .messages
            .iter()
            .filter(|m| {
                m.sender_id != user_id
                    && !m.hidden_for_all
                    && m.created_at > after
                    && inner
                        .members
                        .get(&(m.chat_id, user_id))
                        .is_some_and(|member| member.left_at.is_none())
            })
            .collect();
        rows.sort_by_key(|m| m.created_at);
        rows.truncate(limit.max(0) as usize);
        Ok(rows.into_iter().filter_map(|m| inner.view(m)).collect())
    }

    async fn mark_chat_delivered(&self, chat_id: Uuid, reader: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut changed = 0;
        for m in inner.messages.iter_mut() {
            if m.chat_id == chat_id && m.sender_id != reader && m.status == MessageStatus::Sent {
                m.status = MessageStatus::Delivered;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn hide_message_for_all(&self, message_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.next_ts();
        if let Some(m) = inner.messages.iter_mut().find(|m| m.id == message_id) {
            m.hidden_for_all = true;
            m.hidden_at.get_or_insert(now);
        }
        Ok(())
    }

    async fn hide_message_for_user(&self, message_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.next_ts();
        match inner.messages.iter_mut().find(|m| m.id == message_id) {
            Some(m) => match m.hidden_by {
                None => {
                    m.hidden_by = Some(user_id);
                    m.hidden_at.get_or_insert(now);
                    Ok(true)
                }
                Some(hider) => Ok(hider == user_id),
            },
            None => Ok(false),
        }
    }
}

#[async_trait]
impl MembershipStore for MemStore {
    async fn user_exists(&self, user_id: Uuid) -> AppResult<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.contains_key(&user_id))
    }

    async fn get_user_profile(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn chat_exists(&self, chat_id: Uuid) -> AppResult<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.chats.contains_key(&chat_id))
    }

    async fn is_active_member(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .members
            .get(&(chat_id, user_id))
            .is_some_and(|m| m.left_at.is_none()))
    }

    async fn find_or_create_direct_chat(
        &self,
        user_id: Uuid,
        partner_id: Uuid,
    ) -> AppResult<Uuid> {
        let mut inner = self.inner.lock().unwrap();
        let key = direct_chat_key(user_id, partner_id);

        let chat_id = match inner.direct_keys.get(&key) {
            Some(&existing) => existing,
            None => {
                let chat_id = Uuid::new_v4();
                inner.chats.insert(
                    chat_id,
                    ChatRecord {
                        id: chat_id,
                        is_group: false,
                    },
                );
                inner.direct_keys.insert(key, chat_id);
                chat_id
            }
        };

        for member in [user_id, partner_id] {
            inner
                .members
                .entry((chat_id, member))
                .or_insert(MemberRecord { left_at: None });
        }
        if let Some(member) = inner.members.get_mut(&(chat_id, user_id)) {
            member.left_at = None;
        }

        Ok(chat_id)
    }

    async fn leave_chat(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.next_ts();
        match inner.members.get_mut(&(chat_id, user_id)) {
            Some(member) if member.left_at.is_none() => {
                member.left_at = Some(now);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn chat_overviews(&self, user_id: Uuid) -> AppResult<Vec<ChatOverviewRow>> {
        let inner = self.inner.lock().unwrap();
        let mut rows = Vec::new();

        for chat in inner.chats.values() {
            let active = inner
                .members
                .get(&(chat.id, user_id))
                .is_some_and(|m| m.left_at.is_none());
            if !active {
                continue;
            }

            let partner = if chat.is_group {
                None
            } else {
                inner
                    .members
                    .keys()
                    .find(|(c, u)| *c == chat.id && *u != user_id)
                    .and_then(|(_, u)| inner.users.get(u))
            };

            let last = inner
                .messages
                .iter()
                .filter(|m| m.chat_id == chat.id && inner.visible_to(m, user_id))
                .max_by_key(|m| m.created_at);

            let unread = inner
                .messages
                .iter()
                .filter(|m| {
                    m.chat_id == chat.id
                        && m.sender_id != user_id
                        && m.status == MessageStatus::Sent
                        && !m.hidden_for_all
                        && m.hidden_by != Some(user_id)
                })
                .count() as i64;

            rows.push(ChatOverviewRow {
                id: chat.id,
                is_group: chat.is_group,
                name: None,
                partner_id: partner.map(|p| p.id),
                partner_name: partner.map(|p| p.display_name.clone()),
                partner_avatar: partner.and_then(|p| p.avatar.clone()),
                partner_online: partner.map(|p| p.online),
                last_message: last.map(|m| m.text.clone()),
                last_timestamp: last.map(|m| m.created_at),
                unread,
            });
        }

        rows.sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp));
        Ok(rows)
    }
}

#[async_trait]
impl CallStore for MemStore {
    async fn create_call(
        &self,
        chat_id: Uuid,
        caller_id: Uuid,
        callee_id: Uuid,
        call_type: CallType,
        sdp_offer: &str,
    ) -> AppResult<(Uuid, DateTime<Utc>)> {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.next_ts();
        for call in inner.calls.iter_mut() {
            if (call.caller_id == caller_id || call.callee_id == caller_id)
                && call.status.is_live()
            {
                call.status = CallStatus::Cancelled;
                call.ended_at = Some(now);
            }
        }

        let created_at = inner.next_ts();
        let call = Call {
            id: Uuid::new_v4(),
            chat_id,
            caller_id,
            callee_id,
            call_type,
            status: CallStatus::Ringing,
            sdp_offer: sdp_offer.to_owned(),
            sdp_answer: None,
            created_at,
            answered_at: None,
            ended_at: None,
        };
        let call_id = call.id;
        inner.calls.push(call);
        Ok((call_id, created_at))
    }

    async fn answer_call(
        &self,
        call_id: Uuid,
        callee_id: Uuid,
        sdp_answer: &str,
    ) -> AppResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.next_ts();
        match inner.calls.iter_mut().find(|c| {
            c.id == call_id && c.callee_id == callee_id && c.status == CallStatus::Ringing
        }) {
            Some(call) => {
                call.status = CallStatus::Active;
                call.sdp_answer = Some(sdp_answer.to_owned());
                call.answered_at = Some(now);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn reject_call(&self, call_id: Uuid, callee_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.next_ts();
        match inner.calls.iter_mut().find(|c| {
            c.id == call_id && c.callee_id == callee_id && c.status == CallStatus::Ringing
        }) {
            Some(call) => {
                call.status = CallStatus::Rejected;
                call.ended_at = Some(now);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn end_call(&self, call_id: Uuid, user_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.next_ts();
        match inner.calls.iter_mut().find(|c| {
            c.id == call_id
                && (c.caller_id == user_id || c.callee_id == user_id)
                && c.status.is_live()
        }) {
            Some(call) => {
                call.status = CallStatus::Ended;
                call.ended_at = Some(now);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn insert_ice_candidate(
        &self,
        call_id: Uuid,
        sender_id: Uuid,
        candidate: &str,
    ) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.calls.iter().any(|c| c.id == call_id) {
            return Err(AppError::NotFound(anyhow!("Call not found")));
        }
        let created_at = inner.next_ts();
        inner.ice.push(IceCandidate {
            id: Uuid::new_v4(),
            call_id,
            sender_id,
            candidate: candidate.to_owned(),
            created_at,
        });
        Ok(())
    }

    async fn current_call(&self, user_id: Uuid, ttl: Duration) -> AppResult<Option<CallView>> {
        let inner = self.inner.lock().unwrap();
        let cutoff = Utc::now() - ttl;
        let call = inner
            .calls
            .iter()
            .filter(|c| {
                (c.caller_id == user_id || c.callee_id == user_id)
                    && c.status.is_live()
                    && c.created_at > cutoff
            })
            .max_by_key(|c| c.created_at);

        Ok(call.and_then(|c| {
            let peer_id = if c.caller_id == user_id {
                c.callee_id
            } else {
                c.caller_id
            };
            let peer = inner.users.get(&peer_id)?;
            Some(CallView {
                id: c.id,
                caller_id: c.caller_id,
                callee_id: c.callee_id,
                chat_id: c.chat_id,
                call_type: c.call_type,
                status: c.status,
                sdp_offer: c.sdp_offer.clone(),
                sdp_answer: c.sdp_answer.clone(),
                created_at: c.created_at,
                peer_name: peer.display_name.clone(),
                peer_avatar: peer.avatar.clone(),
            })
        }))
    }

    async fn ice_candidates_from_peer(
        &self,
        call_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Vec<IcePayload>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<&IceCandidate> = inner
            .ice
            .iter()
            .filter(|c| c.call_id == call_id && c.sender_id != user_id)
            .collect();
        rows.sort_by_key(|c| c.created_at);
        Ok(rows
            .into_iter()
            .map(|c| IcePayload {
                id: c.id,
                candidate: c.candidate.clone(),
            })
            .collect())
    }
}
