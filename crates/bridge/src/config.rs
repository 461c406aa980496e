use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use tradrx_client::ProviderUrls;
use tradrx_core::BridgeError;
use tradrx_feed::{FeedConfig, ReconnectConfig};

/// Bridge configuration. Every field has a sensible default, so an
/// empty document (or no file at all) yields the stock setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// REST polling cadence in seconds.
    pub poll_interval_secs: u64,
    /// Stream handshake deadline in seconds.
    pub connect_timeout_secs: u64,
    /// Stream keep-alive cadence in seconds.
    pub ping_interval_secs: u64,
    /// First reconnect delay in milliseconds; doubles per failure.
    pub reconnect_base_ms: u64,
    /// Reconnect delay ceiling in milliseconds.
    pub reconnect_max_ms: u64,
    /// Consecutive stream failures tolerated before giving up.
    pub max_reconnect_attempts: u32,
    pub coingecko_base_url: String,
    pub binance_base_url: String,
    pub binance_stream_url: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            connect_timeout_secs: 10,
            ping_interval_secs: 30,
            reconnect_base_ms: 1000,
            reconnect_max_ms: 30_000,
            max_reconnect_attempts: 5,
            coingecko_base_url: "https://api.coingecko.com/api/v3".to_string(),
            binance_base_url: "https://api.binance.com/api/v3".to_string(),
            binance_stream_url: "wss://stream.binance.com:9443/ws".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Validation(format!("cannot read config {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| BridgeError::Validation(format!("invalid config: {e}")))
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ping_interval: Duration::from_secs(self.ping_interval_secs),
            reconnect: ReconnectConfig {
                base_delay: Duration::from_millis(self.reconnect_base_ms),
                max_delay: Duration::from_millis(self.reconnect_max_ms),
                max_attempts: self.max_reconnect_attempts,
            },
        }
    }

    pub fn provider_urls(&self) -> ProviderUrls {
        ProviderUrls {
            coingecko: self.coingecko_base_url.clone(),
            binance: self.binance_base_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.binance_stream_url, "wss://stream.binance.com:9443/ws");
    }

    #[test]
    fn partial_document_overrides_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
            poll_interval_secs = 10
            max_reconnect_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.max_reconnect_attempts, 3);
        // Untouched fields keep defaults.
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn feed_config_carries_reconnect_knobs() {
        let config = BridgeConfig {
            reconnect_base_ms: 500,
            max_reconnect_attempts: 2,
            ..Default::default()
        };
        let feed = config.feed_config();
        assert_eq!(feed.reconnect.base_delay, Duration::from_millis(500));
        assert_eq!(feed.reconnect.max_attempts, 2);
    }
}
