// ============================================================================
// API Gateway - session & signing key rotation
// ============================================================================
//
// Startup order:
//   1. config + tracing
//   2. shared store (Redis)
//   3. bootstrap the verification key from the key issuer (fatal on failure)
//   4. key rotation consumer (background task)
//   5. HTTP listener
//
// SIGTERM / Ctrl-C cancels one token: the listener drains, the consumer
// stops between messages.
//
// ============================================================================

mod shutdown;

use anyhow::{Context, Result};
use gateway_config::{Config, LogFormat};
use gateway_redis::RedisClient;
use gateway_shared::clients::HttpKeyIssuer;
use gateway_shared::gateway::{GatewayState, router};
use gateway_shared::kafka::KeyRotationConsumer;
use gateway_shared::{BootstrapLoader, KeyRotationHandler, SessionRegistry, SigningKeyManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config);

    info!("Starting API Gateway v{}", env!("CARGO_PKG_VERSION"));

    // Shared store
    let redis = RedisClient::connect(&config.redis_url)
        .await
        .context("Failed to connect to Redis")?;
    info!("Connected to Redis");

    let sessions = SessionRegistry::new(
        Arc::new(redis),
        &config.redis_key_prefixes,
        config.session.clone(),
    );

    // Verification key must be loaded before any request is served
    let keys = Arc::new(SigningKeyManager::new());
    let issuer = HttpKeyIssuer::new(&config.key_issuer)?;
    info!(url = %issuer.url(), "Loading public key from key issuer");
    BootstrapLoader::from_config(&config.key_issuer)
        .load(&issuer, &keys)
        .await
        .context("Failed to load public key from key issuer")?;

    let shutdown = CancellationToken::new();
    shutdown::spawn_signal_listener(shutdown.clone());

    // Key rotation consumer
    let handler = KeyRotationHandler::new(keys.clone(), sessions.clone());
    let consumer = KeyRotationConsumer::new(config.kafka.clone(), handler);
    let consumer_task = tokio::spawn(consumer.run(shutdown.clone()));

    // HTTP listener
    let app = router(GatewayState::new(keys, sessions))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Invalid BIND_ADDRESS/PORT")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    let server_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await;

    // Listener gone for whatever reason: stop the consumer too
    shutdown.cancel();
    if let Err(e) = consumer_task.await {
        error!(error = %e, "Key rotation consumer task failed");
    }

    served.context("HTTP server error")?;
    info!("API Gateway stopped");
    Ok(())
}
