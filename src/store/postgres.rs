pub mod calls;
pub mod chats;
pub mod messages;

use sqlx::PgPool;

/// Store backed by the relational database. One pool shared across all
/// domains; operations that span statements open their own transaction.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
