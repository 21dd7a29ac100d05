use axum::{http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Application error type for the gateway
///
/// The first group is the session/key-rotation taxonomy. Callers outside the
/// core must treat all of them as an authentication failure; their details
/// are logged and never sent to the client.
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Session & Signing Key Errors =====
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Key issuer unavailable after {attempts} attempts: {reason}")]
    IssuerUnavailable { attempts: u32, reason: String },

    // ===== Authentication Errors =====
    #[error("Authentication error: {0}")]
    Auth(String),

    #[cfg(feature = "jwt")]
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // ===== Serialization Errors =====
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== Message Queue & Kafka Errors =====
    #[error("Kafka error: {0}")]
    Kafka(String),

    // ===== Configuration Errors =====
    #[error("Configuration error: {0}")]
    Config(String),

    // ===== Internal Server Errors =====
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_)
            | AppError::InvalidKeyFormat(_)
            | AppError::StoreUnavailable(_)
            | AppError::IssuerUnavailable { .. }
            | AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Kafka(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message (without sensitive details)
    pub fn user_message(&self) -> String {
        match self.status_code() {
            StatusCode::UNAUTHORIZED => "Unauthenticated".to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Get error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidKeyFormat(_) => "INVALID_KEY_FORMAT",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::IssuerUnavailable { .. } => "ISSUER_UNAVAILABLE",
            AppError::Auth(_) => "AUTH_ERROR",
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => "JWT_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Kafka(_) => "KAFKA_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// True for "no such session", which callers must tell apart from "invalid session"
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Log this error with appropriate level and context
    pub fn log(&self) {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = %code,
                status = %status.as_u16(),
                "Server error occurred"
            );
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                error = %self,
                error_code = %code,
                "Authentication failed"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = %code,
                "Client error occurred"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();

        // The error code is withheld too: it would tell a caller whether a
        // session exists for a token.
        let response_body = json!({
            "error": self.user_message(),
            "status": status.as_u16(),
        });

        (status, axum::Json(response_body)).into_response()
    }
}

// ============================================================================
// Conversion from common error types
// ============================================================================

#[cfg(feature = "redis")]
impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

#[cfg(feature = "kafka")]
impl From<rdkafka::error::KafkaError> for AppError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        tracing::error!(error = %err, "Kafka error occurred");
        AppError::Kafka(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // Without the URL: it may carry credentials in the query string
        AppError::Internal(format!("HTTP request failed: {}", err.without_url()))
    }
}

// ============================================================================
// Helper functions for creating common errors
// ============================================================================

impl AppError {
    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    /// Create an invalid key format error
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        AppError::InvalidKeyFormat(msg.into())
    }

    /// Create a store unavailable error
    pub fn store(msg: impl Into<String>) -> Self {
        AppError::StoreUnavailable(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        AppError::Auth(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }

    /// Create an internal server error
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Create a Kafka error
    pub fn kafka(msg: impl Into<String>) -> Self {
        AppError::Kafka(msg.into())
    }
}
