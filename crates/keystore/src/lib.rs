//! Credential storage for the TradrX bridge.
//!
//! Values are obfuscated (see [`obfuscate`]) before they touch the
//! backend, with metadata alongside for staleness warnings. Corrupt or
//! foreign entries never error; they read back as "not configured".

pub mod backend;
pub mod obfuscate;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tradrx_core::{BridgeError, CredentialField, CredentialStatus, Exchange, FieldStatus};

use crate::backend::KeyValueStore;

/// Staleness threshold for stored keys. Old keys still work; they just
/// draw a warning on retrieval.
const STALE_AFTER_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Metadata persisted next to each obfuscated value. Field names match
/// the stored document format.
#[derive(Debug, Serialize, Deserialize)]
struct CredentialMeta {
    /// Epoch milliseconds at store time.
    stored: i64,
    exchange: String,
    #[serde(rename = "keyType")]
    key_type: String,
}

/// Per-exchange credential store over a key-value backend.
pub struct KeyStore<S> {
    backend: S,
}

impl<S: KeyValueStore> KeyStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Validate, obfuscate and persist one credential value. Overwrites
    /// any prior value for the same slot and removes a legacy cleartext
    /// entry if one exists.
    pub fn store(
        &self,
        exchange: Exchange,
        field: CredentialField,
        raw_value: &str,
    ) -> Result<(), BridgeError> {
        let value = raw_value.trim();
        validate(exchange, field, value)?;

        let encoded = obfuscate::encode(value);
        self.backend.set(&enc_key(exchange, field), &encoded);

        let meta = CredentialMeta {
            stored: Utc::now().timestamp_millis(),
            exchange: exchange.as_str().to_string(),
            key_type: field.as_str().to_string(),
        };
        if let Ok(meta_json) = serde_json::to_string(&meta) {
            self.backend.set(&meta_key(exchange, field), &meta_json);
        }

        // Migrate away from the pre-obfuscation storage layout.
        self.backend.remove(&legacy_key(exchange, field));

        info!(exchange = %exchange, field = %field, "Credential stored");
        Ok(())
    }

    /// De-obfuscated plaintext for one slot, or an empty string when
    /// the slot is absent or its contents cannot be decoded.
    pub fn retrieve(&self, exchange: Exchange, field: CredentialField) -> String {
        let Some(encoded) = self.backend.get(&enc_key(exchange, field)) else {
            return String::new();
        };

        self.warn_if_stale(exchange, field);

        match obfuscate::decode(&encoded) {
            Some(plain) => plain,
            None => {
                warn!(
                    exchange = %exchange,
                    field = %field,
                    "Stored credential could not be decoded, treating as not configured"
                );
                String::new()
            }
        }
    }

    /// Which fields hold a value, without exposing the values.
    pub fn status(&self, exchange: Exchange) -> CredentialStatus {
        let fields: Vec<FieldStatus> = exchange
            .required_fields()
            .iter()
            .map(|&field| FieldStatus {
                field,
                configured: !self.retrieve(exchange, field).is_empty(),
            })
            .collect();

        CredentialStatus {
            exchange,
            configured: !fields.is_empty() && fields.iter().all(|f| f.configured),
            fields,
        }
    }

    /// True when every required field for `exchange` holds a value.
    pub fn is_configured(&self, exchange: Exchange) -> bool {
        self.status(exchange).configured
    }

    /// Erase every credential for every known exchange, including
    /// legacy cleartext entries. Idempotent.
    pub fn clear_all(&self) {
        const ALL_FIELDS: [CredentialField; 3] = [
            CredentialField::ApiKey,
            CredentialField::SecretKey,
            CredentialField::Passphrase,
        ];
        for exchange in Exchange::ALL {
            for field in ALL_FIELDS {
                self.backend.remove(&enc_key(exchange, field));
                self.backend.remove(&meta_key(exchange, field));
                self.backend.remove(&legacy_key(exchange, field));
            }
        }
        info!("All stored credentials cleared");
    }

    fn warn_if_stale(&self, exchange: Exchange, field: CredentialField) {
        let Some(meta_json) = self.backend.get(&meta_key(exchange, field)) else {
            return;
        };
        let Ok(meta) = serde_json::from_str::<CredentialMeta>(&meta_json) else {
            return;
        };
        let age_ms = Utc::now().timestamp_millis() - meta.stored;
        if age_ms > STALE_AFTER_MS {
            warn!(
                exchange = %exchange,
                field = %field,
                age_days = age_ms / (24 * 60 * 60 * 1000),
                "Stored API key is older than 30 days"
            );
        }
    }
}

fn enc_key(exchange: Exchange, field: CredentialField) -> String {
    format!("{}_{}_enc", exchange.as_str(), field.as_str())
}

fn meta_key(exchange: Exchange, field: CredentialField) -> String {
    format!("{}_{}_meta", exchange.as_str(), field.as_str())
}

fn legacy_key(exchange: Exchange, field: CredentialField) -> String {
    format!("{}_{}", exchange.as_str(), field.as_str())
}

/// Per-exchange/per-field format checks, applied before anything is
/// persisted. Public so callers can vet a whole credential batch
/// before committing any of it.
pub fn validate(
    exchange: Exchange,
    field: CredentialField,
    value: &str,
) -> Result<(), BridgeError> {
    if value.is_empty() {
        return Err(BridgeError::Validation(
            "API key cannot be empty".to_string(),
        ));
    }

    match (exchange, field) {
        (Exchange::Binance, CredentialField::ApiKey) => {
            if value.len() < 32 || !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(BridgeError::Validation(
                    "Invalid Binance API key format".to_string(),
                ));
            }
        }
        (Exchange::Binance, CredentialField::SecretKey) => {
            let base64_charset =
                |b: u8| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=';
            if value.len() < 32 || !value.bytes().all(base64_charset) {
                return Err(BridgeError::Validation(
                    "Invalid Binance secret key format".to_string(),
                ));
            }
        }
        (Exchange::Coinbase, CredentialField::ApiKey) => {
            if value.len() < 16
                || !value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
            {
                return Err(BridgeError::Validation(
                    "Invalid Coinbase API key format".to_string(),
                ));
            }
        }
        // Remaining slots only require a non-empty value.
        _ => {}
    }

    Ok(())
}
