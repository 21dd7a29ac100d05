//! HTTP clients for the services the gateway depends on at startup.

pub mod issuer;

pub use issuer::{HttpKeyIssuer, parse_public_key_response};
