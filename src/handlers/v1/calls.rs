use anyhow::anyhow;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::handlers::v1::parse_uuid;
use crate::middlewares::identity::Identity;
use crate::models::calls::CallType;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CallCommand {
    Initiate(InitiateCall),
    Answer(AnswerCall),
    Ice(SubmitIce),
    End(EndCall),
    Reject(RejectCall),
    Poll,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InitiateCall {
    pub callee_id: String,
    pub chat_id: String,
    #[serde(default)]
    pub call_type: CallType,
    #[validate(length(min = 1, message = "sdp_offer must not be empty"))]
    pub sdp_offer: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnswerCall {
    pub call_id: String,
    #[validate(length(min = 1, message = "sdp_answer must not be empty"))]
    pub sdp_answer: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitIce {
    pub call_id: String,
    #[validate(length(min = 1, message = "candidate must not be empty"))]
    pub candidate: String,
}

#[derive(Debug, Deserialize)]
pub struct EndCall {
    pub call_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectCall {
    pub call_id: String,
}

pub async fn dispatch(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    let command: CallCommand = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid calls command: {}", e)))?;

    match command {
        CallCommand::Initiate(payload) => {
            payload
                .validate()
                .map_err(|e| AppError::BadRequest(anyhow!("Invalid payload: {}", e)))?;
            let callee_id = parse_uuid(&payload.callee_id, "callee_id")?;
            let chat_id = parse_uuid(&payload.chat_id, "chat_id")?;
            let receipt = state
                .calls
                .initiate(
                    user_id,
                    callee_id,
                    chat_id,
                    payload.call_type,
                    &payload.sdp_offer,
                )
                .await?;
            Ok(Json(receipt).into_response())
        }
        CallCommand::Answer(payload) => {
            payload
                .validate()
                .map_err(|e| AppError::BadRequest(anyhow!("Invalid payload: {}", e)))?;
            let call_id = parse_uuid(&payload.call_id, "call_id")?;
            state.calls.answer(user_id, call_id, &payload.sdp_answer).await?;
            Ok(Json(json!({ "ok": true })).into_response())
        }
        CallCommand::Ice(payload) => {
            payload
                .validate()
                .map_err(|e| AppError::BadRequest(anyhow!("Invalid payload: {}", e)))?;
            let call_id = parse_uuid(&payload.call_id, "call_id")?;
            state
                .calls
                .submit_ice(user_id, call_id, &payload.candidate)
                .await?;
            Ok(Json(json!({ "ok": true })).into_response())
        }
        CallCommand::End(payload) => {
            let call_id = parse_uuid(&payload.call_id, "call_id")?;
            state.calls.end(user_id, call_id).await?;
            Ok(Json(json!({ "ok": true })).into_response())
        }
        CallCommand::Reject(payload) => {
            let call_id = parse_uuid(&payload.call_id, "call_id")?;
            state.calls.reject(user_id, call_id).await?;
            Ok(Json(json!({ "ok": true })).into_response())
        }
        CallCommand::Poll => match state.calls.poll(user_id).await? {
            Some((call, candidates)) => {
                Ok(Json(json!({ "call": call, "ice_candidates": candidates })).into_response())
            }
            None => Ok(Json(json!({ "call": null })).into_response()),
        },
    }
}
