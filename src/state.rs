//! Application state

use std::time::Duration;

use sqlx::PgPool;

use crate::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connection attempts at startup
const MAX_CONNECT_ATTEMPTS: u32 = 5;
/// Initial backoff between attempts
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool; the database is the source of truth,
    /// nothing is cached in-process
    pub pool: PgPool,
}

impl AppState {
    /// Connect to PostgreSQL (with startup backoff) and run migrations
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = connect_pool(config).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

async fn connect_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    let url = config.database_url();
    let mut delay = INITIAL_RETRY_DELAY;

    for attempt in 1..=MAX_CONNECT_ATTEMPTS {
        match PgPool::connect(&url).await {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < MAX_CONNECT_ATTEMPTS => {
                tracing::warn!(
                    attempt,
                    max_attempts = MAX_CONNECT_ATTEMPTS,
                    delay_secs = delay.as_secs(),
                    "Database connect failed, retrying: {e}"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!()
}
