use anyhow::anyhow;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::handlers::v1::parse_uuid;
use crate::middlewares::identity::Identity;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChatCommand {
    Create(CreateChat),
    List,
    Read(ReadChat),
}

#[derive(Debug, Deserialize)]
pub struct CreateChat {
    pub partner_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReadChat {
    pub chat_id: String,
}

pub async fn dispatch(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    let command: ChatCommand = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid chats command: {}", e)))?;

    match command {
        ChatCommand::Create(payload) => {
            let partner_id = parse_uuid(&payload.partner_id, "partner_id")?;
            let chat = state.chats.find_or_create_direct(user_id, partner_id).await?;
            Ok(Json(chat).into_response())
        }
        ChatCommand::List => {
            let chats = state.chats.overview(user_id).await?;
            Ok(Json(json!({ "chats": chats })).into_response())
        }
        // Opening a chat marks everything unread in it as delivered.
        ChatCommand::Read(payload) => {
            let chat_id = parse_uuid(&payload.chat_id, "chat_id")?;
            state.messages.mark_delivered(user_id, chat_id).await?;
            Ok(Json(json!({ "ok": true })).into_response())
        }
    }
}
