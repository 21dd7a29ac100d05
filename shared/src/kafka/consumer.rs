// ============================================================================
// Key Rotation Consumer
// ============================================================================
//
// Long-lived task bridging the rotation topic to the key manager and the
// session registry.
//
// State machine:
//   Idle -> Subscribing -> Consuming
//   Consuming --(broker/subscription error)--> pause -> Subscribing
//   any --(shutdown)--> Stopped
//
// Messages are handled one at a time and committed whatever the outcome:
// delivery is at-least-once and handling is idempotent. Client-level errors
// reported by librdkafka go through a channel to a separate drain task that
// only logs them; it ends with the consumer it belongs to.
//
// ============================================================================

use anyhow::{Context, Result};
use gateway_config::KafkaConfig;
use gateway_metrics::{KAFKA_COMMIT_FAILURES_TOTAL, KAFKA_CONSUMER_RESUBSCRIBES_TOTAL};
use rdkafka::consumer::{CommitMode, Consumer, ConsumerContext, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::{ClientContext, Message, Offset, TopicPartitionList};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::create_consumer_config;
use crate::key_management::{KeyRotationHandler, RotationOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Subscribing,
    Consuming,
    Stopped,
}

/// Error reported by the Kafka client outside of message delivery
#[derive(Debug)]
pub(crate) struct ClientError {
    error: KafkaError,
    reason: String,
}

/// Forwards client errors to the drain task instead of librdkafka's default log
pub(crate) struct RotationConsumerContext {
    errors: mpsc::UnboundedSender<ClientError>,
}

impl ClientContext for RotationConsumerContext {
    fn error(&self, error: KafkaError, reason: &str) {
        // Drain task gone means the consumer is shutting down
        let _ = self.errors.send(ClientError {
            error,
            reason: reason.to_string(),
        });
    }
}

impl ConsumerContext for RotationConsumerContext {}

type RotationStreamConsumer = StreamConsumer<RotationConsumerContext>;

/// Why the consume loop returned
enum LoopExit {
    Shutdown,
    Failed(KafkaError),
}

pub struct KeyRotationConsumer {
    config: KafkaConfig,
    handler: KeyRotationHandler,
    state: watch::Sender<ConsumerState>,
}

impl KeyRotationConsumer {
    pub fn new(config: KafkaConfig, handler: KeyRotationHandler) -> Self {
        let (state, _) = watch::channel(ConsumerState::Idle);
        Self {
            config,
            handler,
            state,
        }
    }

    /// Receiver following the consumer's state
    pub fn state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ConsumerState) {
        self.state.send_replace(state);
    }

    fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.config.reconnect_delay_secs)
    }

    /// Consume until `shutdown` is cancelled.
    ///
    /// Shutdown is observed between messages; a message being handled is
    /// finished and committed first.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            topic = %self.config.key_updates_topic,
            group = %self.config.consumer_group,
            brokers = ?self.config.broker_list(),
            "Starting key rotation consumer"
        );

        while !shutdown.is_cancelled() {
            self.set_state(ConsumerState::Subscribing);

            let (errors_tx, errors_rx) = mpsc::unbounded_channel();
            let consumer = match self.subscribe(errors_tx) {
                Ok(consumer) => consumer,
                Err(e) => {
                    error!(error = %e, "Failed to subscribe to key updates topic");
                    KAFKA_CONSUMER_RESUBSCRIBES_TOTAL.inc();
                    if self.pause(&shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            let drain_stop = shutdown.child_token();
            let drain = spawn_error_drain(errors_rx, drain_stop.clone());

            self.set_state(ConsumerState::Consuming);
            info!(topic = %self.config.key_updates_topic, "Consuming key updates");
            let exit = self.consume(&consumer, &shutdown).await;

            drain_stop.cancel();
            drop(consumer);
            if let Err(e) = drain.await {
                warn!(error = %e, "Kafka error drain task failed");
            }

            match exit {
                LoopExit::Shutdown => break,
                LoopExit::Failed(e) => {
                    error!(
                        error = %e,
                        retry_in_secs = self.config.reconnect_delay_secs,
                        "Key update consumer error, resubscribing"
                    );
                    KAFKA_CONSUMER_RESUBSCRIBES_TOTAL.inc();
                    if self.pause(&shutdown).await {
                        break;
                    }
                }
            }
        }

        self.set_state(ConsumerState::Stopped);
        info!("Key rotation consumer stopped");
    }

    fn subscribe(
        &self,
        errors: mpsc::UnboundedSender<ClientError>,
    ) -> Result<RotationStreamConsumer> {
        let consumer: RotationStreamConsumer = create_consumer_config(&self.config)?
            .create_with_context(RotationConsumerContext { errors })
            .context("Failed to create Kafka consumer")?;

        consumer
            .subscribe(&[&self.config.key_updates_topic])
            .context("Failed to subscribe to Kafka topic")?;

        Ok(consumer)
    }

    async fn consume(
        &self,
        consumer: &RotationStreamConsumer,
        shutdown: &CancellationToken,
    ) -> LoopExit {
        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return LoopExit::Shutdown,
                received = consumer.recv() => received,
            };

            let message = match received {
                Ok(message) => message,
                Err(e) => return LoopExit::Failed(e),
            };

            // Copy out before awaiting; the borrowed message must not be held
            let position = MessagePosition::of(&message);
            let payload = message.payload().map(<[u8]>::to_vec);
            drop(message);

            self.handle_message(consumer, payload.as_deref(), &position)
                .await;
        }
    }

    /// Process one message, then commit past it whatever the outcome
    async fn handle_message(
        &self,
        consumer: &RotationStreamConsumer,
        payload: Option<&[u8]>,
        position: &MessagePosition,
    ) -> RotationOutcome {
        let outcome = self.handler.process_key_update(payload).await;
        log_outcome(&outcome, position.partition, position.offset);

        if let Err(e) = commit(consumer, position) {
            KAFKA_COMMIT_FAILURES_TOTAL.inc();
            warn!(
                error = %e,
                partition = position.partition,
                offset = position.offset,
                "Failed to commit key update offset"
            );
        }
        outcome
    }

    /// Wait out the reconnect delay. Returns true when shutdown fired first.
    async fn pause(&self, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            _ = shutdown.cancelled() => true,
            _ = tokio::time::sleep(self.reconnect_delay()) => false,
        }
    }
}

/// Where a message sits in the topic
#[derive(Debug, Clone, PartialEq, Eq)]
struct MessagePosition {
    topic: String,
    partition: i32,
    offset: i64,
}

impl MessagePosition {
    fn of<M: Message>(message: &M) -> Self {
        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
        }
    }

    /// Offset list committing past this message
    fn commit_list(&self) -> std::result::Result<TopicPartitionList, KafkaError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&self.topic, self.partition, Offset::Offset(self.offset + 1))?;
        Ok(tpl)
    }
}

fn commit(
    consumer: &RotationStreamConsumer,
    position: &MessagePosition,
) -> std::result::Result<(), KafkaError> {
    consumer.commit(&position.commit_list()?, CommitMode::Async)
}

fn log_outcome(outcome: &RotationOutcome, partition: i32, offset: i64) {
    match outcome {
        RotationOutcome::Applied {
            version,
            sweep: Some(report),
        } => info!(
            key_version = version,
            sessions_revoked = report.revoked,
            sessions_failed = report.failed,
            partition = partition,
            offset = offset,
            "Key rotation applied"
        ),
        RotationOutcome::Applied {
            version,
            sweep: None,
        } => warn!(
            key_version = version,
            partition = partition,
            offset = offset,
            "Key rotation applied without a complete session sweep"
        ),
        RotationOutcome::SweepRetried { version, sweep } => info!(
            key_version = version,
            sweep_completed = sweep.is_some(),
            partition = partition,
            offset = offset,
            "Session sweep retried for redelivered key update"
        ),
        other => debug!(outcome = ?other, partition = partition, offset = offset, "Key update handled"),
    }
}

fn spawn_error_drain(
    mut errors: mpsc::UnboundedReceiver<ClientError>,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                received = errors.recv() => match received {
                    Some(e) => warn!(error = %e.error, reason = %e.reason, "Kafka client error"),
                    None => break,
                },
            }
        }
    })
}
