// ============================================================================
// Key Issuer Client - fetch the identity service's current public key
// ============================================================================
//
// GET {KEY_ISSUER_URL}{KEY_ISSUER_PUBLIC_KEY_PATH}
//   200 {"key": {"N": <modulus, decimal>, "E": <exponent>}}
//
// The modulus is a big integer, sent either as a bare JSON number or as a
// string. It is taken from the raw JSON text so no precision is lost.
//
// ============================================================================

use async_trait::async_trait;
use gateway_config::KeyIssuerConfig;
use gateway_error::{AppError, AppResult};
use rsa::BigUint;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::time::Duration;
use tracing::debug;

use crate::key_management::{KeyIssuer, VerificationKey};

#[derive(Deserialize)]
struct PublicKeyResponse {
    key: RsaComponents,
}

#[derive(Deserialize)]
struct RsaComponents {
    #[serde(rename = "N")]
    n: Box<RawValue>,
    #[serde(rename = "E")]
    e: u64,
}

/// Decode the issuer's response body into a verification key
pub fn parse_public_key_response(body: &[u8]) -> AppResult<VerificationKey> {
    let response: PublicKeyResponse = serde_json::from_slice(body)?;

    let digits = response.key.n.get().trim().trim_matches('"');
    let modulus = BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| AppError::invalid_key("modulus is not a decimal integer"))?;

    VerificationKey::from_components(modulus, BigUint::from(response.key.e))
}

/// [`KeyIssuer`] backed by the identity service's HTTP API
#[derive(Clone)]
pub struct HttpKeyIssuer {
    http_client: reqwest::Client,
    url: String,
}

impl HttpKeyIssuer {
    pub fn new(config: &KeyIssuerConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: config.public_key_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl KeyIssuer for HttpKeyIssuer {
    async fn fetch_current_key(&self) -> AppResult<VerificationKey> {
        debug!(url = %self.url, "Fetching public key from key issuer");

        let response = self.http_client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::internal(format!(
                "key issuer returned status {}",
                status
            )));
        }

        let body = response.bytes().await?;
        parse_public_key_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;

    const V0_PEM: &str = include_str!("../../tests/fixtures/rsa_v0_public.pem");
    const V0_RESPONSE: &str = include_str!("../../tests/fixtures/issuer_response_v0.json");

    #[test]
    fn test_parse_numeric_modulus() {
        let key = parse_public_key_response(V0_RESPONSE.as_bytes()).unwrap();
        assert_eq!(key, VerificationKey::from_pem(V0_PEM).unwrap());
    }

    #[test]
    fn test_parse_string_modulus() {
        let expected = VerificationKey::from_pem(V0_PEM).unwrap();
        let body = format!(
            r#"{{"key":{{"N":"{}","E":65537}}}}"#,
            expected.public_key().n()
        );

        let key = parse_public_key_response(body.as_bytes()).unwrap();
        assert_eq!(key, expected);
    }

    #[test]
    fn test_rejects_malformed_bodies() {
        assert!(matches!(
            parse_public_key_response(b"{}"),
            Err(AppError::Json(_))
        ));
        assert!(matches!(
            parse_public_key_response(br#"{"key":{"N":"abc","E":65537}}"#),
            Err(AppError::InvalidKeyFormat(_))
        ));
        assert!(matches!(
            parse_public_key_response(br#"{"key":{"N":12345,"E":1}}"#),
            Err(AppError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_issuer_url_from_config() {
        let config = KeyIssuerConfig {
            base_url: "http://users:8082/".to_string(),
            ..KeyIssuerConfig::default()
        };
        let issuer = HttpKeyIssuer::new(&config).unwrap();
        assert_eq!(issuer.url(), "http://users:8082/api/v1/keys/public");
    }
}
