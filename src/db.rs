use anyhow::{Context, Ok, Result};
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};

use crate::config::Config;

pub async fn connect_to_db(config: &Config) -> Result<PgPool> {
    let schema = config.db_schema.clone();
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .after_connect(move |conn, _meta| {
            let schema = schema.clone();
            Box::pin(async move {
                // Schema is resolved once at startup (and validated as a bare
                // identifier), so queries never interpolate schema names.
                conn.execute(format!("SET search_path TO {}", schema).as_str())
                    .await?;
                std::result::Result::Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}
