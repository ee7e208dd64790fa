//! Kafka event source.
//!
//! Polls the events topic on a dedicated thread and forwards decoded
//! [`RepoEvent`]s into the pipeline's bounded input channel, so a slow
//! pipeline backpressures the consumer instead of piling events up in
//! memory. Reads are at-least-once (offsets auto-commit behind the read
//! position); undecodable payloads are logged and skipped here, before the
//! core ever sees them.

use std::time::Duration;

use anyhow::{Context, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::message::Message;
use serde::Deserialize;
use tracing::{debug, info, warn};

use repotrend_core::channel::LocalChannelSender;
use repotrend_core::types::{RepoEvent, StreamElement};

/// Consumer settings for the events topic.
#[derive(Debug, Clone)]
pub struct KafkaSourceConfig {
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    /// Topic metadata refresh interval, which bounds how quickly newly added
    /// partitions are discovered.
    pub metadata_refresh: Duration,
}

impl Default for KafkaSourceConfig {
    fn default() -> Self {
        Self {
            brokers: "kafka:9092".to_string(),
            topic: "github-events".to_string(),
            group_id: "repotrend".to_string(),
            metadata_refresh: Duration::from_secs(1),
        }
    }
}

/// Wire shape of one event. Only the repository name is consumed; the rest
/// of the payload is ignored.
#[derive(Debug, Deserialize)]
struct WireEvent {
    repo: WireRepo,
}

#[derive(Debug, Deserialize)]
struct WireRepo {
    name: String,
}

/// Decode one event payload into the domain shape.
fn decode_event(payload: &[u8]) -> Result<RepoEvent> {
    let wire: WireEvent = serde_json::from_slice(payload)?;
    Ok(RepoEvent::new(wire.repo.name))
}

/// The subscribed consumer, ready to pump events into the pipeline.
pub struct KafkaSource {
    consumer: BaseConsumer,
}

impl KafkaSource {
    /// Create and subscribe the consumer.
    ///
    /// Consumption starts from the earliest retained offset so a fresh group
    /// replays the topic's history into the counts.
    pub fn connect(config: &KafkaSourceConfig) -> Result<Self> {
        let consumer: BaseConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "true")
            .set(
                "topic.metadata.refresh.interval.ms",
                config.metadata_refresh.as_millis().to_string(),
            )
            .create()
            .context("creating kafka consumer")?;
        consumer
            .subscribe(&[&config.topic])
            .context("subscribing to events topic")?;
        info!(topic = %config.topic, brokers = %config.brokers, "kafka source subscribed");
        Ok(Self { consumer })
    }

    /// Poll-and-forward loop.
    ///
    /// Runs until the pipeline side of the channel goes away, which is the
    /// shutdown (or failure) signal for the source thread. Poll errors are
    /// logged and retried; the client re-establishes broker connections
    /// internally.
    pub fn run(self, events: LocalChannelSender<RepoEvent>) -> Result<()> {
        loop {
            match self.consumer.poll(Duration::from_millis(100)) {
                None => {}
                Some(Err(e)) => {
                    warn!(error = %e, "kafka poll failed");
                }
                Some(Ok(message)) => {
                    let Some(payload) = message.payload() else {
                        continue;
                    };
                    match decode_event(payload) {
                        Ok(event) => {
                            debug!(repo = %event.repo, "event received");
                            events.send(StreamElement::record(event))?;
                        }
                        Err(e) => {
                            warn!(error = %e, "skipping undecodable event");
                        }
                    }
                }
            }
        }
    }
}
