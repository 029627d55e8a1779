//! Service configuration
//!
//! Everything is read from the environment with compiled-in defaults; the
//! deployment only needs to override `DB_HOST` and `NATS_URL`.

use std::time::Duration;

/// Upper bound on the dispatcher batch size
pub const MAX_BATCH_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL host
    pub db_host: String,
    /// PostgreSQL port
    pub db_port: u16,
    /// PostgreSQL user
    pub db_user: String,
    /// PostgreSQL password
    pub db_password: String,
    /// PostgreSQL database name
    pub db_name: String,
    /// NATS server URL
    pub nats_url: String,
    /// NATS username
    pub nats_user: String,
    /// NATS password
    pub nats_password: String,
    /// HTTP listen port
    pub http_port: u16,
    /// Max outbox rows dequeued per dispatcher tick (1..=100)
    pub batch_size: i64,
    /// Dispatcher tick interval
    pub tick_interval: Duration,
    /// How long a publish waits for the broker ack
    pub publish_timeout: Duration,
    /// Stream replication factor
    pub stream_replicas: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            db_host: env_or("DB_HOST", "postgres"),
            db_port: env_parse("DB_PORT", 5432),
            db_user: env_or("DB_USER", "guergabo"),
            db_password: env_or("DB_PASSWORD", "password"),
            db_name: env_or("DB_NAME", "postgres"),
            nats_url: env_or("NATS_URL", "nats://nats:4222"),
            nats_user: env_or("NATS_USER", "guergabo"),
            nats_password: env_or("NATS_PASSWORD", "password"),
            http_port: env_parse("HTTP_PORT", 8000),
            batch_size: env_parse("OUTBOX_BATCH_SIZE", 100_i64).clamp(1, MAX_BATCH_SIZE),
            tick_interval: Duration::from_secs(env_parse("OUTBOX_TICK_SECS", 5)),
            publish_timeout: Duration::from_secs(env_parse("PUBLISH_TIMEOUT_SECS", 5)),
            stream_replicas: env_parse("STREAM_REPLICAS", 1),
        }
    }

    /// PostgreSQL connection URL
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_name
        )
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url() {
        let config = Config {
            db_host: "localhost".into(),
            db_port: 5433,
            db_user: "u".into(),
            db_password: "p".into(),
            db_name: "orders".into(),
            nats_url: "nats://localhost:4222".into(),
            nats_user: String::new(),
            nats_password: String::new(),
            http_port: 8000,
            batch_size: 100,
            tick_interval: Duration::from_secs(5),
            publish_timeout: Duration::from_secs(5),
            stream_replicas: 1,
        };
        assert_eq!(
            config.database_url(),
            "postgres://u:p@localhost:5433/orders?sslmode=disable"
        );
    }

    #[test]
    fn test_batch_size_clamped() {
        // from_env clamps whatever the environment says into 1..=100
        assert_eq!(500_i64.clamp(1, MAX_BATCH_SIZE), 100);
        assert_eq!(0_i64.clamp(1, MAX_BATCH_SIZE), 1);
        assert_eq!(42_i64.clamp(1, MAX_BATCH_SIZE), 42);
    }
}
