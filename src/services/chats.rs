use std::sync::Arc;

use anyhow::anyhow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::chats::{ChatOverview, ChatOverviewRow, DirectChat};
use crate::store::Store;

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn Store>,
}

impl ChatService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_or_create_direct(
        &self,
        user: Uuid,
        partner_id: Uuid,
    ) -> AppResult<DirectChat> {
        if user == partner_id {
            return Err(AppError::BadRequest(anyhow!(
                "Cannot open a chat with yourself"
            )));
        }
        if !self.store.user_exists(user).await? {
            return Err(AppError::NotFound(anyhow!("User not found")));
        }
        let partner = self
            .store
            .get_user_profile(partner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Partner not found")))?;

        let chat_id = self.store.find_or_create_direct_chat(user, partner_id).await?;
        Ok(DirectChat { chat_id, partner })
    }

    #[tracing::instrument(skip(self))]
    pub async fn overview(&self, user: Uuid) -> AppResult<Vec<ChatOverview>> {
        let rows = self.store.chat_overviews(user).await?;
        Ok(rows.into_iter().map(present_overview).collect())
    }

    /// Leaving is idempotent: a second leave, or leaving a chat one never
    /// joined, changes nothing and still succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn leave(&self, user: Uuid, chat_id: Uuid) -> AppResult<()> {
        self.store.leave_chat(chat_id, user).await?;
        Ok(())
    }
}

/// Display fallbacks for the conversation list: a 1:1 chat is titled after
/// the partner, a nameless chat falls back to the generic label, and a
/// missing avatar becomes the name's first letter.
fn present_overview(row: ChatOverviewRow) -> ChatOverview {
    let name = if row.is_group {
        row.name.unwrap_or_else(|| "Чат".to_owned())
    } else {
        row.partner_name
            .or(row.name)
            .unwrap_or_else(|| "Чат".to_owned())
    };
    let avatar = row.partner_avatar.unwrap_or_else(|| {
        name.chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "?".to_owned())
    });

    ChatOverview {
        id: row.id,
        is_group: row.is_group,
        name,
        partner_id: row.partner_id,
        avatar,
        online: row.partner_online.unwrap_or(false),
        last_message: row.last_message.unwrap_or_default(),
        last_timestamp: row.last_timestamp,
        unread: row.unread,
    }
}
