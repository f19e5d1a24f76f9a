mod app_state;
mod config;
mod db;
mod error;
mod handlers;
mod middlewares;
mod models;
mod routes;
mod services;
mod store;


use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,togo_backend=debug")),
        )
        .init();

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match db::connect_to_db(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(store::postgres::PgStore::new(pool));
    let state = app_state::AppState::new(store);
    let app = routes::create_routes().with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str())
        .await
        .unwrap();
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await.unwrap();
}
