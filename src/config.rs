use anyhow::{bail, Context, Result};
use std::env;

/// Runtime configuration, resolved once at startup. The rest of the code
/// never reads the environment directly.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Postgres schema the tables live in. Installed as the connection
    /// search_path when the pool is built; queries use bare table names.
    pub db_schema: String,
    pub bind_addr: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine in deployed environments.
        let _ = dotenvy::dotenv();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let db_schema = env::var("MAIN_DB_SCHEMA").unwrap_or_else(|_| "public".to_string());
        if !is_bare_identifier(&db_schema) {
            bail!("MAIN_DB_SCHEMA must be a plain identifier, got {:?}", db_schema);
        }

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse::<u32>()
                .context("DATABASE_MAX_CONNECTIONS must be an integer")?,
            Err(_) => 20,
        };

        Ok(Config {
            database_url,
            db_schema,
            bind_addr,
            max_connections,
        })
    }
}

// The schema name ends up in a SET search_path statement, so it must never
// carry quoting or punctuation.
pub fn is_bare_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
