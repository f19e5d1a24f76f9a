use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::v1::messages::SyncEntry;
use crate::models::messages::{MessageView, SendReceipt, SyncReceipt};
use crate::store::{NewMessage, Store};

/// Hard cap on one poll batch.
const POLL_LIMIT: i64 = 100;
/// History page size bounds; the default matches what clients request.
const LIST_DEFAULT_LIMIT: i64 = 50;
const LIST_MAX_LIMIT: i64 = 100;
/// How long a sender may retract a message for everyone.
const DELETE_FOR_ALL_WINDOW_HOURS: i64 = 24;

#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn Store>,
}

impl MessageService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, text, client_id))]
    pub async fn send(
        &self,
        sender: Uuid,
        chat_id: Uuid,
        text: &str,
        client_id: &str,
    ) -> AppResult<SendReceipt> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::BadRequest(anyhow!("text must not be empty")));
        }
        if !self.store.user_exists(sender).await? {
            return Err(AppError::NotFound(anyhow!("Sender not found")));
        }
        if !self.store.chat_exists(chat_id).await? {
            return Err(AppError::NotFound(anyhow!("Chat not found")));
        }

        let inserted = self.store.insert_message(chat_id, sender, text).await?;
        Ok(SendReceipt {
            id: inserted.id,
            client_id: client_id.to_owned(),
            chat_id,
            sender_id: sender,
            text: text.to_owned(),
            status: inserted.status,
            created_at: inserted.created_at,
        })
    }

    /// Offline-queue flush: every entry that passes the same checks as
    /// `send` is inserted in one transaction; the rest are dropped without
    /// failing the batch. Entries absent from the result were not applied.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn sync(&self, sender: Uuid, items: &[SyncEntry]) -> AppResult<Vec<SyncReceipt>> {
        if !self.store.user_exists(sender).await? {
            return Err(AppError::NotFound(anyhow!("Sender not found")));
        }

        let mut indices = Vec::new();
        let mut rows = Vec::new();
        for (idx, item) in items.iter().enumerate() {
            let Ok(chat_id) = Uuid::parse_str(item.chat_id.trim()) else {
                continue;
            };
            let text = item.text.trim();
            if text.is_empty() {
                continue;
            }
            indices.push(idx);
            rows.push(NewMessage {
                chat_id,
                text: text.to_owned(),
            });
        }

        let inserted = self.store.insert_messages(sender, &rows).await?;

        let mut receipts = Vec::new();
        for (&idx, receipt) in indices.iter().zip(inserted) {
            if let Some(row) = receipt {
                receipts.push(SyncReceipt {
                    id: row.id,
                    client_id: items[idx].client_id.clone(),
                    status: row.status,
                    created_at: row.created_at,
                });
            }
        }
        Ok(receipts)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        requester: Uuid,
        chat_id: Uuid,
        after: Option<DateTime<Utc>>,
        limit: Option<i64>,
    ) -> AppResult<Vec<MessageView>> {
        let limit = limit
            .unwrap_or(LIST_DEFAULT_LIMIT)
            .clamp(1, LIST_MAX_LIMIT);
        self.store
            .list_chat_messages(chat_id, requester, after, limit)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn poll(&self, user: Uuid, after: DateTime<Utc>) -> AppResult<Vec<MessageView>> {
        self.store.poll_new_messages(user, after, POLL_LIMIT).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(&self, reader: Uuid, chat_id: Uuid) -> AppResult<()> {
        if !self.store.is_active_member(chat_id, reader).await? {
            return Err(AppError::Forbidden(anyhow!("Not a member of this chat")));
        }
        self.store.mark_chat_delivered(chat_id, reader).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, requester: Uuid, message_id: Uuid, for_all: bool) -> AppResult<()> {
        let message = self
            .store
            .get_message(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Message not found")))?;

        if for_all {
            if message.sender_id != requester {
                return Err(AppError::Forbidden(anyhow!(
                    "Only the sender can delete a message for everyone"
                )));
            }
            if Utc::now() - message.created_at > Duration::hours(DELETE_FOR_ALL_WINDOW_HOURS) {
                return Err(AppError::Expired(anyhow!(
                    "The window for deleting this message for everyone has passed"
                )));
            }
            self.store.hide_message_for_all(message_id).await
        } else {
            if !self.store.is_active_member(message.chat_id, requester).await? {
                return Err(AppError::Forbidden(anyhow!("Not a member of this chat")));
            }
            // Single hide-for-me slot per message: the first hider wins and
            // a later attempt by someone else changes nothing, successfully.
            let claimed = self
                .store
                .hide_message_for_user(message_id, requester)
                .await?;
            if !claimed {
                tracing::debug!(%message_id, "hide-for-me slot already taken");
            }
            Ok(())
        }
    }
}
