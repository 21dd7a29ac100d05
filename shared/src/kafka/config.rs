use anyhow::Result;
use gateway_config::KafkaConfig;
use rdkafka::config::ClientConfig;
use tracing::info;

/// Creates a new `rdkafka::config::ClientConfig` from the application's `KafkaConfig`.
///
/// It handles:
/// - Setting up bootstrap servers.
/// - Enabling SSL/TLS if `ssl_enabled` is true, with an optional CA file.
/// - Configuring SASL authentication if a mechanism, username and password are provided.
pub fn create_client_config(config: &KafkaConfig) -> Result<ClientConfig> {
    let mut client_config = ClientConfig::new();
    client_config.set("bootstrap.servers", &config.brokers);

    // Default to plaintext if SSL is not explicitly enabled and no SASL.
    client_config.set("security.protocol", "plaintext");

    if config.ssl_enabled {
        info!("Enabling SSL/TLS for Kafka connection");
        client_config.set("security.protocol", "ssl");
        if let Some(ca) = &config.ssl_ca_location {
            client_config.set("ssl.ca.location", ca);
        }
    }

    if let (Some(mechanism), Some(username), Some(password)) = (
        &config.sasl_mechanism,
        &config.sasl_username,
        &config.sasl_password,
    ) {
        info!(sasl_mechanism = %mechanism, "Configuring SASL authentication");
        client_config
            .set("sasl.mechanism", mechanism)
            .set("sasl.username", username)
            .set("sasl.password", password);

        if config.ssl_enabled {
            client_config.set("security.protocol", "sasl_ssl");
        } else {
            client_config.set("security.protocol", "sasl_plaintext");
        }
    }

    Ok(client_config)
}

/// Consumer configuration for the key rotation topic.
///
/// - `partition.assignment.strategy=roundrobin`: spread partitions evenly over replicas.
/// - `auto.offset.reset=latest`: a (re)joining member skips the backlog; only
///   the newest key matters.
/// - `enable.auto.commit=false`: offsets are committed after each message is handled.
pub fn create_consumer_config(config: &KafkaConfig) -> Result<ClientConfig> {
    let mut client_config = create_client_config(config)?;
    client_config
        .set("group.id", &config.consumer_group)
        .set("partition.assignment.strategy", "roundrobin")
        .set("auto.offset.reset", "latest")
        .set("enable.auto.commit", "false")
        .set("enable.partition.eof", "false")
        .set("allow.auto.create.topics", "true")
        // Session management
        .set("session.timeout.ms", "30000")
        .set("heartbeat.interval.ms", "3000");
    Ok(client_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kafka_config() -> KafkaConfig {
        KafkaConfig {
            brokers: "k1:9092,k2:9092".to_string(),
            key_updates_topic: "public-key-updates".to_string(),
            consumer_group: "api-gateway".to_string(),
            ssl_enabled: false,
            sasl_mechanism: None,
            sasl_username: None,
            sasl_password: None,
            ssl_ca_location: None,
            reconnect_delay_secs: 5,
        }
    }

    #[test]
    fn test_plaintext_by_default() {
        let client_config = create_client_config(&kafka_config()).unwrap();
        assert_eq!(client_config.get("bootstrap.servers"), Some("k1:9092,k2:9092"));
        assert_eq!(client_config.get("security.protocol"), Some("plaintext"));
        assert_eq!(client_config.get("sasl.username"), None);
    }

    #[test]
    fn test_sasl_over_ssl() {
        let config = KafkaConfig {
            ssl_enabled: true,
            ssl_ca_location: Some("/etc/ssl/ca.pem".to_string()),
            sasl_mechanism: Some("SCRAM-SHA-256".to_string()),
            sasl_username: Some("gateway".to_string()),
            sasl_password: Some("secret".to_string()),
            ..kafka_config()
        };
        let client_config = create_client_config(&config).unwrap();
        assert_eq!(client_config.get("security.protocol"), Some("sasl_ssl"));
        assert_eq!(client_config.get("sasl.mechanism"), Some("SCRAM-SHA-256"));
        assert_eq!(client_config.get("ssl.ca.location"), Some("/etc/ssl/ca.pem"));
    }

    #[test]
    fn test_consumer_reads_newest_with_round_robin() {
        let client_config = create_consumer_config(&kafka_config()).unwrap();
        assert_eq!(client_config.get("group.id"), Some("api-gateway"));
        assert_eq!(
            client_config.get("partition.assignment.strategy"),
            Some("roundrobin")
        );
        assert_eq!(client_config.get("auto.offset.reset"), Some("latest"));
        assert_eq!(client_config.get("enable.auto.commit"), Some("false"));
    }
}
