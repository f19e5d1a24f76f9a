use anyhow::anyhow;
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::chats::{direct_chat_key, ChatOverviewRow};
use crate::models::messages::MessageStatus;
use crate::models::users::UserProfile;
use crate::store::postgres::PgStore;
use crate::store::MembershipStore;

#[async_trait]
impl MembershipStore for PgStore {
    async fn user_exists(&self, user_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to check user: {}", e);
                AppError::InternalServerError(anyhow!("Failed to check user"))
            })
    }

    async fn get_user_profile(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        sqlx::query_as::<_, UserProfile>(
            r#"SELECT id, phone, display_name, avatar, is_online AS online
               FROM users
               WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch user profile: {}", e);
            AppError::InternalServerError(anyhow!("Failed to fetch user profile"))
        })
    }

    async fn chat_exists(&self, chat_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM chats WHERE id = $1)")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to check chat: {}", e);
                AppError::InternalServerError(anyhow!("Failed to check chat"))
            })
    }

    async fn is_active_member(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        sqlx::query_scalar(
            r#"SELECT EXISTS (
                   SELECT 1 FROM chat_members
                   WHERE chat_id = $1 AND user_id = $2 AND left_at IS NULL
               )"#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check chat membership: {}", e);
            AppError::InternalServerError(anyhow!("Failed to check chat membership"))
        })
    }

    async fn find_or_create_direct_chat(
        &self,
        user_id: Uuid,
        partner_id: Uuid,
    ) -> AppResult<Uuid> {
        let key = direct_chat_key(user_id, partner_id);

        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin chat transaction: {}", e);
            AppError::InternalServerError(anyhow!("Failed to create chat"))
        })?;

        // Two clients creating the same pair concurrently race on the
        // unique key; the loser's insert is a no-op and the select below
        // lands on the winner's row either way.
        sqlx::query(
            r#"INSERT INTO chats (is_group, direct_key)
               VALUES (FALSE, $1)
               ON CONFLICT (direct_key) DO NOTHING"#,
        )
        .bind(&key)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create chat: {}", e);
            AppError::InternalServerError(anyhow!("Failed to create chat"))
        })?;

        let chat_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM chats WHERE direct_key = $1")
            .bind(&key)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to look up chat: {}", e);
                AppError::InternalServerError(anyhow!("Failed to create chat"))
            })?;

        sqlx::query(
            r#"INSERT INTO chat_members (chat_id, user_id)
               VALUES ($1, $2), ($1, $3)
               ON CONFLICT (chat_id, user_id) DO NOTHING"#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(partner_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to add chat members: {}", e);
            AppError::InternalServerError(anyhow!("Failed to create chat"))
        })?;

        // Re-opening a chat one had left makes it active again, for the
        // requester only.
        sqlx::query(
            r#"UPDATE chat_members
               SET left_at = NULL
               WHERE chat_id = $1 AND user_id = $2 AND left_at IS NOT NULL"#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to re-activate chat membership: {}", e);
            AppError::InternalServerError(anyhow!("Failed to create chat"))
        })?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit chat transaction: {}", e);
            AppError::InternalServerError(anyhow!("Failed to create chat"))
        })?;

        Ok(chat_id)
    }

    async fn leave_chat(&self, chat_id: Uuid, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"UPDATE chat_members
               SET left_at = now()
               WHERE chat_id = $1 AND user_id = $2 AND left_at IS NULL"#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to leave chat: {}", e);
            AppError::InternalServerError(anyhow!("Failed to leave chat"))
        })?;
        Ok(result.rows_affected())
    }

    async fn chat_overviews(&self, user_id: Uuid) -> AppResult<Vec<ChatOverviewRow>> {
        sqlx::query_as::<_, ChatOverviewRow>(
            r#"SELECT c.id, c.is_group, c.name,
                      u2.id AS partner_id, u2.display_name AS partner_name,
                      u2.avatar AS partner_avatar, u2.is_online AS partner_online,
                      lm.text AS last_message, lm.created_at AS last_timestamp,
                      (SELECT COUNT(*) FROM messages m
                       WHERE m.chat_id = c.id
                         AND m.sender_id <> $1
                         AND m.status = $2
                         AND m.hidden_for_all = FALSE
                         AND (m.hidden_by IS NULL OR m.hidden_by <> $1)) AS unread
               FROM chats c
               JOIN chat_members cm
                 ON cm.chat_id = c.id AND cm.user_id = $1 AND cm.left_at IS NULL
               LEFT JOIN chat_members cm2
                 ON cm2.chat_id = c.id AND cm2.user_id <> $1 AND c.is_group = FALSE
               LEFT JOIN users u2 ON u2.id = cm2.user_id
               LEFT JOIN LATERAL (
                   SELECT m.text, m.created_at
                   FROM messages m
                   WHERE m.chat_id = c.id
                     AND m.hidden_for_all = FALSE
                     AND (m.hidden_by IS NULL OR m.hidden_by <> $1 OR m.sender_id = $1)
                   ORDER BY m.created_at DESC
                   LIMIT 1
               ) lm ON TRUE
               ORDER BY lm.created_at DESC NULLS LAST"#,
        )
        .bind(user_id)
        .bind(MessageStatus::Sent)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list chats: {}", e);
            AppError::InternalServerError(anyhow!("Failed to list chats"))
        })
    }
}
