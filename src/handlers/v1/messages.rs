use anyhow::anyhow;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::handlers::v1::parse_uuid;
use crate::middlewares::identity::Identity;

/// Commands accepted on the messages endpoint, selected by the `action`
/// tag. Each variant carries its own typed payload; anything that does not
/// parse into one of these is a 400.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MessageCommand {
    Send(SendMessage),
    List(ListMessages),
    Sync(SyncMessages),
    Poll(PollMessages),
    DeleteMessage(DeleteMessage),
    LeaveChat(LeaveChat),
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessage {
    pub chat_id: String,
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
    #[serde(default)]
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListMessages {
    pub chat_id: String,
    pub after: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SyncMessages {
    #[serde(default)]
    pub messages: Vec<SyncEntry>,
}

/// One queued offline send. Fields default to empty so a partially formed
/// entry is skipped by the batch instead of rejecting the whole flush.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncEntry {
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PollMessages {
    pub after: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMessage {
    pub message_id: String,
    #[serde(default)]
    pub for_all: bool,
}

#[derive(Debug, Deserialize)]
pub struct LeaveChat {
    pub chat_id: String,
}

pub async fn dispatch(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    let command: MessageCommand = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid messages command: {}", e)))?;

    match command {
        MessageCommand::Send(payload) => {
            payload
                .validate()
                .map_err(|e| AppError::BadRequest(anyhow!("Invalid payload: {}", e)))?;
            let chat_id = parse_uuid(&payload.chat_id, "chat_id")?;
            let receipt = state
                .messages
                .send(user_id, chat_id, &payload.text, &payload.client_id)
                .await?;
            Ok(Json(receipt).into_response())
        }
        MessageCommand::List(payload) => {
            let chat_id = parse_uuid(&payload.chat_id, "chat_id")?;
            let messages = state
                .messages
                .list(user_id, chat_id, payload.after, payload.limit)
                .await?;
            Ok(Json(json!({ "messages": messages })).into_response())
        }
        MessageCommand::Sync(payload) => {
            let results = state.messages.sync(user_id, &payload.messages).await?;
            Ok(Json(json!({ "results": results })).into_response())
        }
        MessageCommand::Poll(payload) => {
            let messages = state.messages.poll(user_id, payload.after).await?;
            Ok(Json(json!({ "messages": messages })).into_response())
        }
        MessageCommand::DeleteMessage(payload) => {
            let message_id = parse_uuid(&payload.message_id, "message_id")?;
            state
                .messages
                .delete(user_id, message_id, payload.for_all)
                .await?;
            Ok(Json(json!({ "ok": true })).into_response())
        }
        MessageCommand::LeaveChat(payload) => {
            let chat_id = parse_uuid(&payload.chat_id, "chat_id")?;
            state.chats.leave(user_id, chat_id).await?;
            Ok(Json(json!({ "ok": true })).into_response())
        }
    }
}
