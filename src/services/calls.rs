use std::sync::Arc;

use anyhow::anyhow;
use chrono::Duration;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::calls::{CallReceipt, CallType, CallView, IcePayload};
use crate::store::Store;

/// A ringing call older than this is treated as abandoned by pollers; the
/// stored row keeps its status until resolved or superseded.
const CALL_TTL_MINUTES: i64 = 2;

#[derive(Clone)]
pub struct CallService {
    store: Arc<dyn Store>,
}

impl CallService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, sdp_offer))]
    pub async fn initiate(
        &self,
        caller: Uuid,
        callee_id: Uuid,
        chat_id: Uuid,
        call_type: CallType,
        sdp_offer: &str,
    ) -> AppResult<CallReceipt> {
        if sdp_offer.is_empty() {
            return Err(AppError::BadRequest(anyhow!("sdp_offer must not be empty")));
        }
        if !self.store.user_exists(caller).await? {
            return Err(AppError::NotFound(anyhow!("Caller not found")));
        }
        if !self.store.user_exists(callee_id).await? {
            return Err(AppError::NotFound(anyhow!("Callee not found")));
        }
        if !self.store.chat_exists(chat_id).await? {
            return Err(AppError::NotFound(anyhow!("Chat not found")));
        }

        let (call_id, created_at) = self
            .store
            .create_call(chat_id, caller, callee_id, call_type, sdp_offer)
            .await?;
        Ok(CallReceipt {
            call_id,
            created_at,
        })
    }

    /// The zero-row outcome deliberately conflates "no such call", "already
    /// answered" and "not the callee" into one 404, so an outsider cannot
    /// probe call state.
    #[tracing::instrument(skip(self, sdp_answer))]
    pub async fn answer(&self, callee: Uuid, call_id: Uuid, sdp_answer: &str) -> AppResult<()> {
        if sdp_answer.is_empty() {
            return Err(AppError::BadRequest(anyhow!(
                "sdp_answer must not be empty"
            )));
        }
        let updated = self.store.answer_call(call_id, callee, sdp_answer).await?;
        if updated == 0 {
            return Err(AppError::NotFound(anyhow!(
                "Call not found or already answered"
            )));
        }
        Ok(())
    }

    /// Rejecting a call that already resolved is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn reject(&self, callee: Uuid, call_id: Uuid) -> AppResult<()> {
        self.store.reject_call(call_id, callee).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn end(&self, user: Uuid, call_id: Uuid) -> AppResult<()> {
        self.store.end_call(call_id, user).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, candidate))]
    pub async fn submit_ice(&self, sender: Uuid, call_id: Uuid, candidate: &str) -> AppResult<()> {
        if candidate.is_empty() {
            return Err(AppError::BadRequest(anyhow!("candidate must not be empty")));
        }
        self.store.insert_ice_candidate(call_id, sender, candidate).await
    }

    /// At most one live, fresh call for the user, with the other party's
    /// ICE candidates so far. Candidates carry no cursor; clients keep a
    /// seen-id set.
    #[tracing::instrument(skip(self))]
    pub async fn poll(&self, user: Uuid) -> AppResult<Option<(CallView, Vec<IcePayload>)>> {
        let ttl = Duration::minutes(CALL_TTL_MINUTES);
        let Some(call) = self.store.current_call(user, ttl).await? else {
            return Ok(None);
        };
        let candidates = self.store.ice_candidates_from_peer(call.id, user).await?;
        Ok(Some((call, candidates)))
    }
}
