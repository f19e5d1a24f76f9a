use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::calls::{CallStatus, CallType, CallView, IcePayload};
use crate::store::postgres::PgStore;
use crate::store::CallStore;

#[async_trait]
impl CallStore for PgStore {
    async fn create_call(
        &self,
        chat_id: Uuid,
        caller_id: Uuid,
        callee_id: Uuid,
        call_type: CallType,
        sdp_offer: &str,
    ) -> AppResult<(Uuid, DateTime<Utc>)> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin call transaction: {}", e);
            AppError::InternalServerError(anyhow!("Failed to initiate call"))
        })?;

        // One live call per user: whatever the caller is still party to,
        // on either side, gets cancelled before the new call appears.
        sqlx::query(
            r#"UPDATE calls
               SET status = $1, ended_at = now()
               WHERE (caller_id = $2 OR callee_id = $2)
                 AND status IN ($3, $4)"#,
        )
        .bind(CallStatus::Cancelled)
        .bind(caller_id)
        .bind(CallStatus::Ringing)
        .bind(CallStatus::Active)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to cancel previous calls: {}", e);
            AppError::InternalServerError(anyhow!("Failed to initiate call"))
        })?;

        let (call_id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"INSERT INTO calls (chat_id, caller_id, callee_id, call_type, sdp_offer)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, created_at"#,
        )
        .bind(chat_id)
        .bind(caller_id)
        .bind(callee_id)
        .bind(call_type)
        .bind(sdp_offer)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert call: {}", e);
            AppError::InternalServerError(anyhow!("Failed to initiate call"))
        })?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit call transaction: {}", e);
            AppError::InternalServerError(anyhow!("Failed to initiate call"))
        })?;

        Ok((call_id, created_at))
    }

    async fn answer_call(
        &self,
        call_id: Uuid,
        callee_id: Uuid,
        sdp_answer: &str,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"UPDATE calls
               SET status = $1, sdp_answer = $2, answered_at = now()
               WHERE id = $3 AND callee_id = $4 AND status = $5"#,
        )
        .bind(CallStatus::Active)
        .bind(sdp_answer)
        .bind(call_id)
        .bind(callee_id)
        .bind(CallStatus::Ringing)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to answer call: {}", e);
            AppError::InternalServerError(anyhow!("Failed to answer call"))
        })?;
        Ok(result.rows_affected())
    }

    async fn reject_call(&self, call_id: Uuid, callee_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"UPDATE calls
               SET status = $1, ended_at = now()
               WHERE id = $2 AND callee_id = $3 AND status = $4"#,
        )
        .bind(CallStatus::Rejected)
        .bind(call_id)
        .bind(callee_id)
        .bind(CallStatus::Ringing)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to reject call: {}", e);
            AppError::InternalServerError(anyhow!("Failed to reject call"))
        })?;
        Ok(result.rows_affected())
    }

    async fn end_call(&self, call_id: Uuid, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"UPDATE calls
               SET status = $1, ended_at = now()
               WHERE id = $2
                 AND (caller_id = $3 OR callee_id = $3)
                 AND status IN ($4, $5)"#,
        )
        .bind(CallStatus::Ended)
        .bind(call_id)
        .bind(user_id)
        .bind(CallStatus::Ringing)
        .bind(CallStatus::Active)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to end call: {}", e);
            AppError::InternalServerError(anyhow!("Failed to end call"))
        })?;
        Ok(result.rows_affected())
    }

    async fn insert_ice_candidate(
        &self,
        call_id: Uuid,
        sender_id: Uuid,
        candidate: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"INSERT INTO ice_candidates (call_id, sender_id, candidate)
               VALUES ($1, $2, $3)"#,
        )
        .bind(call_id)
        .bind(sender_id)
        .bind(candidate)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow!("Call not found"))
            }
            _ => {
                tracing::error!("Failed to store ice candidate: {}", e);
                AppError::InternalServerError(anyhow!("Failed to store ice candidate"))
            }
        })
    }

    async fn current_call(&self, user_id: Uuid, ttl: Duration) -> AppResult<Option<CallView>> {
        sqlx::query_as::<_, CallView>(
            r#"SELECT c.id, c.caller_id, c.callee_id, c.chat_id, c.call_type, c.status,
                      c.sdp_offer, c.sdp_answer, c.created_at,
                      u.display_name AS peer_name, u.avatar AS peer_avatar
               FROM calls c
               JOIN users u
                 ON u.id = CASE WHEN c.caller_id = $1 THEN c.callee_id ELSE c.caller_id END
               WHERE (c.caller_id = $1 OR c.callee_id = $1)
                 AND c.status IN ($2, $3)
                 AND c.created_at > $4
               ORDER BY c.created_at DESC
               LIMIT 1"#,
        )
        .bind(user_id)
        .bind(CallStatus::Ringing)
        .bind(CallStatus::Active)
        .bind(Utc::now() - ttl)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to poll calls: {}", e);
            AppError::InternalServerError(anyhow!("Failed to poll calls"))
        })
    }

    async fn ice_candidates_from_peer(
        &self,
        call_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Vec<IcePayload>> {
        sqlx::query_as::<_, IcePayload>(
            r#"SELECT id, candidate
               FROM ice_candidates
               WHERE call_id = $1 AND sender_id <> $2
               ORDER BY created_at ASC"#,
        )
        .bind(call_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch ice candidates: {}", e);
            AppError::InternalServerError(anyhow!("Failed to fetch ice candidates"))
        })
    }
}
