mod index;
mod v1;
use crate::app_state::AppState;
use axum::http::HeaderName;
use axum::{http::header, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_routes() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
        ]);

    Router::new()
        .merge(index::index_route())
        .nest("/api/v1", v1::v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
