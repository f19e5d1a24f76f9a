use crate::app_state::AppState;
use crate::handlers::v1::messages;
use axum::{routing::post, Router};

pub fn message_routes() -> Router<AppState> {
    Router::new().route("/", post(messages::dispatch))
}
