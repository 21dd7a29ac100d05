use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public key rotation event published by the key issuer
///
/// Wire format: `{"serviceName", "publicKeyPEM", "keyVersion"}`. The issuer's
/// snake_case field names are accepted as well, together with its optional
/// event id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRotationEvent {
    /// Service that rotated its key
    #[serde(rename = "serviceName", alias = "service_name")]
    pub service_name: String,

    /// New public key, SPKI PEM
    #[serde(rename = "publicKeyPEM", alias = "public_key_pem")]
    pub public_key_pem: String,

    /// Version the issuer assigned to this key
    #[serde(rename = "keyVersion", alias = "key_version")]
    pub key_version: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(
        default,
        rename = "updatedAt",
        alias = "updated_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl KeyRotationEvent {
    pub fn new(
        service_name: impl Into<String>,
        public_key_pem: impl Into<String>,
        key_version: i64,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            public_key_pem: public_key_pem.into(),
            key_version,
            id: None,
            updated_at: None,
        }
    }

    pub fn from_slice(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}
