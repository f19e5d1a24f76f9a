use crate::app_state::AppState;
use crate::handlers::v1::calls;
use axum::{routing::post, Router};

pub fn call_routes() -> Router<AppState> {
    Router::new().route("/", post(calls::dispatch))
}
