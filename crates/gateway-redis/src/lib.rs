//! # Gateway Redis
//!
//! Low-level Redis client for the API gateway's shared store.
//!
//! ## Design Principles
//!
//! - **No business logic** - Pure infrastructure layer
//! - **No dependencies** on other gateway-* crates
//! - **TTL everywhere** - every write either sets or keeps an expiry
//!
//! ## Example
//!
//! ```rust,no_run
//! use gateway_redis::RedisClient;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = RedisClient::connect("redis://localhost:6379").await?;
//!
//!     client.set_ex("key", "value", Duration::from_secs(3600)).await?;
//!     let value: Option<String> = client.get("key").await?;
//!
//!     Ok(())
//! }
//! ```

mod client;

pub use client::{RedisClient, ScanPage};

// Re-export commonly used types
pub use redis::RedisError;

/// Result type for Redis operations
pub type Result<T> = std::result::Result<T, RedisError>;
