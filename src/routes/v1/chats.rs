use crate::app_state::AppState;
use crate::handlers::v1::chats;
use axum::{routing::post, Router};

pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/", post(chats::dispatch))
}
