pub mod calls;
pub mod chats;
pub mod messages;
use crate::app_state::AppState;
use axum::Router;

pub fn v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/messages", messages::message_routes())
        .nest("/chats", chats::chat_routes())
        .nest("/calls", calls::call_routes())
}
