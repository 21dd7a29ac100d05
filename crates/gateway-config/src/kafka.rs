// ============================================================================
// Kafka Configuration
// ============================================================================

use crate::constants::DEFAULT_KAFKA_RECONNECT_DELAY_SECS;
use crate::env_parse;

/// Kafka configuration for the key rotation event log
#[derive(Clone, Debug)]
pub struct KafkaConfig {
    /// Comma-separated list of Kafka brokers (e.g., "kafka1:9092,kafka2:9092")
    pub brokers: String,
    /// Topic carrying public key rotation events
    pub key_updates_topic: String,
    /// Consumer group ID shared by all gateway replicas' members
    pub consumer_group: String,
    /// SSL/TLS enabled
    pub ssl_enabled: bool,
    /// SASL mechanism (e.g., "SCRAM-SHA-256", "PLAIN")
    pub sasl_mechanism: Option<String>,
    /// SASL username
    pub sasl_username: Option<String>,
    /// SASL password
    pub sasl_password: Option<String>,
    /// Path to CA certificate file (for self-signed certificates)
    pub ssl_ca_location: Option<String>,
    /// Pause before resubscribing after a subscription/broker error
    pub reconnect_delay_secs: u64,
}

impl KafkaConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            brokers: std::env::var("KAFKA_BROKERS")
                .unwrap_or_else(|_| "localhost:9092".to_string()),
            key_updates_topic: std::env::var("KAFKA_KEY_UPDATES_TOPIC")
                .unwrap_or_else(|_| "public-key-updates".to_string()),
            consumer_group: std::env::var("KAFKA_CONSUMER_GROUP")
                .unwrap_or_else(|_| "api-gateway".to_string()),
            ssl_enabled: env_parse("KAFKA_SSL_ENABLED", false),
            sasl_mechanism: std::env::var("KAFKA_SASL_MECHANISM").ok(),
            sasl_username: std::env::var("KAFKA_SASL_USERNAME").ok(),
            sasl_password: std::env::var("KAFKA_SASL_PASSWORD").ok(),
            ssl_ca_location: std::env::var("KAFKA_SSL_CA_LOCATION").ok(),
            reconnect_delay_secs: env_parse(
                "KAFKA_RECONNECT_DELAY_SECS",
                DEFAULT_KAFKA_RECONNECT_DELAY_SECS,
            ),
        }
    }

    /// Broker list split on commas, for logging
    pub fn broker_list(&self) -> Vec<&str> {
        self.brokers
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .collect()
    }
}
