// Kafka integration for public key rotation events
//
// The key issuer publishes one event per rotation; every gateway replica
// consumes them through a shared consumer group.

pub mod config;
pub mod consumer;
pub mod types;

pub use config::{create_client_config, create_consumer_config};
pub use consumer::{ConsumerState, KeyRotationConsumer};
pub use types::KeyRotationEvent;
