//! Broker adapter — NATS JetStream
//!
//! Provisions the durable `ORDERS` stream and exposes a synchronous publish:
//! `publish` returns only after the broker has acknowledged durable receipt,
//! or errors out. On a timeout the message is *possibly* delivered; callers
//! must leave the outbox row pending so the next tick retries.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::Config;

/// Durable stream name
pub const STREAM_NAME: &str = "ORDERS";
/// Subject pattern the stream captures
pub const STREAM_SUBJECTS: &str = "ORDERS.*";
/// Subject for order creation events. Hard-coded in v1; deriving the
/// subject from `aggregate_type` is a v2 change.
pub const SUBJECT_ORDER_CREATED: &str = "ORDERS.new";

/// Connection attempts at startup
const MAX_CONNECT_ATTEMPTS: u32 = 5;
/// Initial backoff between attempts
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connect failed: {0}")]
    Connect(#[source] BoxError),
    #[error("stream provisioning failed: {0}")]
    Provision(#[source] BoxError),
    #[error("publish failed: {0}")]
    Publish(#[source] BoxError),
    #[error("publish ack timed out after {0:?}")]
    AckTimeout(Duration),
    #[error("drain failed: {0}")]
    Drain(#[source] BoxError),
}

/// Publish seam between the dispatcher and the broker
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish `payload` and wait for the broker's durable ack
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BrokerError>;
}

pub struct Broker {
    client: async_nats::Client,
    jetstream: async_nats::jetstream::Context,
    publish_timeout: Duration,
    stream_replicas: usize,
}

/// Config for the `ORDERS` stream: work-queue retention so consumed
/// messages are dropped once acked by the downstream work queue
fn stream_config(replicas: usize) -> async_nats::jetstream::stream::Config {
    async_nats::jetstream::stream::Config {
        name: STREAM_NAME.to_string(),
        subjects: vec![STREAM_SUBJECTS.to_string()],
        retention: async_nats::jetstream::stream::RetentionPolicy::WorkQueue,
        num_replicas: replicas,
        ..Default::default()
    }
}

impl Broker {
    /// Connect to NATS with exponential backoff (5 attempts, base 1 s)
    pub async fn connect(config: &Config) -> Result<Self, BrokerError> {
        let mut delay = INITIAL_RETRY_DELAY;

        for attempt in 1..=MAX_CONNECT_ATTEMPTS {
            let options = async_nats::ConnectOptions::new()
                .name("order-relay")
                .user_and_password(config.nats_user.clone(), config.nats_password.clone())
                .connection_timeout(Duration::from_secs(5));

            match options.connect(config.nats_url.as_str()).await {
                Ok(client) => {
                    let jetstream = async_nats::jetstream::new(client.clone());
                    return Ok(Self {
                        client,
                        jetstream,
                        publish_timeout: config.publish_timeout,
                        stream_replicas: config.stream_replicas,
                    });
                }
                Err(e) if attempt < MAX_CONNECT_ATTEMPTS => {
                    tracing::warn!(
                        attempt,
                        max_attempts = MAX_CONNECT_ATTEMPTS,
                        delay_secs = delay.as_secs(),
                        "Broker connect failed, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(BrokerError::Connect(e.into())),
            }
        }

        unreachable!()
    }

    /// Ensure the `ORDERS` stream exists. Idempotent.
    pub async fn provision(&self) -> Result<(), BrokerError> {
        let stream = self
            .jetstream
            .get_or_create_stream(stream_config(self.stream_replicas))
            .await
            .map_err(|e| BrokerError::Provision(e.into()))?;

        let info = stream.cached_info();
        tracing::info!(
            stream = STREAM_NAME,
            messages = info.state.messages,
            "Stream provisioned"
        );
        Ok(())
    }

    /// Flush in-flight publishes and close the connection
    pub async fn drain(&self) -> Result<(), BrokerError> {
        self.client
            .drain()
            .await
            .map_err(|e| BrokerError::Drain(e.into()))
    }
}

#[async_trait]
impl EventPublisher for Broker {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        let ack = async {
            let ack_future = self
                .jetstream
                .publish(subject.to_string(), Bytes::from(payload))
                .await
                .map_err(|e| BrokerError::Publish(e.into()))?;
            ack_future
                .await
                .map_err(|e| BrokerError::Publish(e.into()))?;
            Ok(())
        };

        match tokio::time::timeout(self.publish_timeout, ack).await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::AckTimeout(self.publish_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config() {
        let config = stream_config(3);
        assert_eq!(config.name, "ORDERS");
        assert_eq!(config.subjects, vec!["ORDERS.*".to_string()]);
        assert_eq!(
            config.retention,
            async_nats::jetstream::stream::RetentionPolicy::WorkQueue
        );
        assert_eq!(config.num_replicas, 3);
    }

    #[test]
    fn test_creation_subject_matches_stream_pattern() {
        let prefix = STREAM_SUBJECTS.trim_end_matches('*');
        assert!(SUBJECT_ORDER_CREATED.starts_with(prefix));
        assert_eq!(SUBJECT_ORDER_CREATED, "ORDERS.new");
    }
}
