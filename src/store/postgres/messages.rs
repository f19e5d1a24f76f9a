use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::messages::{Message, MessageStatus, MessageView};
use crate::store::postgres::PgStore;
use crate::store::{InsertedMessage, MessageStore, NewMessage};

#[async_trait]
impl MessageStore for PgStore {
    async fn insert_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        text: &str,
    ) -> AppResult<InsertedMessage> {
        sqlx::query_as::<_, InsertedMessage>(
            r#"INSERT INTO messages (chat_id, sender_id, text)
               VALUES ($1, $2, $3)
               RETURNING id, status, created_at"#,
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert message: {}", e);
            AppError::InternalServerError(anyhow!("Failed to insert message"))
        })
    }

    async fn insert_messages(
        &self,
        sender_id: Uuid,
        items: &[NewMessage],
    ) -> AppResult<Vec<Option<InsertedMessage>>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin sync transaction: {}", e);
            AppError::InternalServerError(anyhow!("Failed to begin transaction"))
        })?;

        let mut receipts = Vec::with_capacity(items.len());
        for item in items {
            let known: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM chats WHERE id = $1)")
                    .bind(item.chat_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to check chat during sync: {}", e);
                        AppError::InternalServerError(anyhow!("Failed to sync messages"))
                    })?;
            if !known {
                receipts.push(None);
                continue;
            }

            let row = sqlx::query_as::<_, InsertedMessage>(
                r#"INSERT INTO messages (chat_id, sender_id, text)
                   VALUES ($1, $2, $3)
                   RETURNING id, status, created_at"#,
            )
            .bind(item.chat_id)
            .bind(sender_id)
            .bind(item.text.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert message during sync: {}", e);
                AppError::InternalServerError(anyhow!("Failed to sync messages"))
            })?;
            receipts.push(Some(row));
        }

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit sync transaction: {}", e);
            AppError::InternalServerError(anyhow!("Failed to sync messages"))
        })?;
        Ok(receipts)
    }

    async fn get_message(&self, message_id: Uuid) -> AppResult<Option<Message>> {
        sqlx::query_as::<_, Message>(
            r#"SELECT id, chat_id, sender_id, text, status,
                      hidden_for_all, hidden_by, hidden_at, created_at
               FROM messages
               WHERE id = $1"#,
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch message: {}", e);
            AppError::InternalServerError(anyhow!("Failed to fetch message"))
        })
    }

    async fn list_chat_messages(
        &self,
        chat_id: Uuid,
        requester: Uuid,
        after: Option<DateTime<Utc>>,
        limit: i64,
    ) -> AppResult<Vec<MessageView>> {
        // The same visibility rule in both branches: for-all-hidden rows are
        // gone for everyone, a for-me hide only affects the user who set it,
        // and a sender keeps seeing their own messages regardless.
        let result = match after {
            Some(cursor) => {
                sqlx::query_as::<_, MessageView>(
                    r#"SELECT m.id, m.chat_id, m.sender_id, m.text, m.status, m.created_at,
                              u.display_name AS sender_name, u.avatar AS sender_avatar
                       FROM messages m
                       JOIN users u ON u.id = m.sender_id
                       WHERE m.chat_id = $1
                         AND m.hidden_for_all = FALSE
                         AND (m.hidden_by IS NULL OR m.hidden_by <> $2 OR m.sender_id = $2)
                         AND m.created_at > $3
                       ORDER BY m.created_at ASC, m.id ASC
                       LIMIT $4"#,
                )
                .bind(chat_id)
                .bind(requester)
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                let mut rows = sqlx::query_as::<_, MessageView>(
                    r#"SELECT m.id, m.chat_id, m.sender_id, m.text, m.status, m.created_at,
                              u.display_name AS sender_name, u.avatar AS sender_avatar
                       FROM messages m
                       JOIN users u ON u.id = m.sender_id
                       WHERE m.chat_id = $1
                         AND m.hidden_for_all = FALSE
                         AND (m.hidden_by IS NULL OR m.hidden_by <> $2 OR m.sender_id = $2)
                       ORDER BY m.created_at DESC, m.id DESC
                       LIMIT $3"#,
                )
                .bind(chat_id)
                .bind(requester)
                .bind(limit)
                .fetch_all(&self.pool)
                .await;
                // Newest page, presented oldest first.
                if let Ok(rows) = rows.as_mut() {
                    rows.reverse();
                }
                rows
            }
        };

        result.map_err(|e| {
            tracing::error!("Failed to list chat messages: {}", e);
            AppError::InternalServerError(anyhow!("Failed to list chat messages"))
        })
    }

    async fn poll_new_messages(
        &self,
        user_id: Uuid,
        after: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<MessageView>> {
        sqlx::query_as::<_, MessageView>(
            r#"SELECT m.id, m.chat_id, m.sender_id, m.text, m.status, m.created_at,
                      u.display_name AS sender_name, u.avatar AS sender_avatar
               FROM messages m
               JOIN chat_members cm
                 ON cm.chat_id = m.chat_id AND cm.user_id = $1 AND cm.left_at IS NULL
               JOIN users u ON u.id = m.sender_id
               WHERE m.sender_id <> $1
                 AND m.hidden_for_all = FALSE
                 AND m.created_at > $2
               ORDER BY m.created_at ASC, m.id ASC
               LIMIT $3"#,
        )
        .bind(user_id)
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to poll messages: {}", e);
            AppError::InternalServerError(anyhow!("Failed to poll messages"))
        })
    }

    async fn mark_chat_delivered(&self, chat_id: Uuid, reader: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"UPDATE messages
               SET status = $1
               WHERE chat_id = $2 AND sender_id <> $3 AND status = $4"#,
        )
        .bind(MessageStatus::Delivered)
        .bind(chat_id)
        .bind(reader)
        .bind(MessageStatus::Sent)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark chat delivered: {}", e);
            AppError::InternalServerError(anyhow!("Failed to mark chat delivered"))
        })?;
        Ok(result.rows_affected())
    }

    async fn hide_message_for_all(&self, message_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"UPDATE messages
               SET hidden_for_all = TRUE, hidden_at = COALESCE(hidden_at, now())
               WHERE id = $1"#,
        )
        .bind(message_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to hide message: {}", e);
            AppError::InternalServerError(anyhow!("Failed to hide message"))
        })?;
        Ok(())
    }

    async fn hide_message_for_user(&self, message_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"UPDATE messages
               SET hidden_by = $2, hidden_at = COALESCE(hidden_at, now())
               WHERE id = $1 AND (hidden_by IS NULL OR hidden_by = $2)"#,
        )
        .bind(message_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to hide message for user: {}", e);
            AppError::InternalServerError(anyhow!("Failed to hide message"))
        })?;
        Ok(result.rows_affected() > 0)
    }
}
