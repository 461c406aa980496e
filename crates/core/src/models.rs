use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Exchanges & Providers
// ---------------------------------------------------------------------------

/// A trading venue that can hold caller-supplied API credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exchange {
    Binance,
    Coinbase,
}

impl Exchange {
    /// All known exchanges, in storage order.
    pub const ALL: [Exchange; 2] = [Exchange::Binance, Exchange::Coinbase];

    /// Lowercase identifier used in storage keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Binance => "binance",
            Exchange::Coinbase => "coinbase",
        }
    }

    /// Credential fields this exchange requires before trading calls
    /// are allowed.
    pub fn required_fields(&self) -> &'static [CredentialField] {
        match self {
            Exchange::Binance => &[CredentialField::ApiKey, CredentialField::SecretKey],
            Exchange::Coinbase => &[
                CredentialField::ApiKey,
                CredentialField::SecretKey,
                CredentialField::Passphrase,
            ],
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binance" => Ok(Exchange::Binance),
            "coinbase" => Ok(Exchange::Coinbase),
            other => Err(format!("unknown exchange: {other}")),
        }
    }
}

/// An upstream API surface subject to rate limiting. CoinGecko serves
/// public market data and needs no credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    CoinGecko,
    Binance,
    Coinbase,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::CoinGecko => "coingecko",
            Provider::Binance => "binance",
            Provider::Coinbase => "coinbase",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// A single credential slot for an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialField {
    ApiKey,
    SecretKey,
    Passphrase,
}

impl CredentialField {
    /// Identifier used in storage keys; matches the stored metadata format.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialField::ApiKey => "apiKey",
            CredentialField::SecretKey => "secretKey",
            CredentialField::Passphrase => "passphrase",
        }
    }
}

impl std::fmt::Display for CredentialField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which credential fields are configured for an exchange. Values are
/// never exposed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialStatus {
    pub exchange: Exchange,
    /// True when every required field holds a value.
    pub configured: bool,
    pub fields: Vec<FieldStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldStatus {
    pub field: CredentialField,
    pub configured: bool,
}

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// Latest observed quote for a trading pair, normalized from whichever
/// feed (stream or poll) last reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPair {
    /// Human-readable pair, e.g. "BTC/USDT".
    pub symbol: String,
    pub price: Decimal,
    pub change_percent_24h: Decimal,
}

/// Connection state of the streaming feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    /// No connection attempted.
    Idle,
    /// Stream handshake in flight.
    Connecting,
    /// Receiving live ticks.
    Streaming,
    /// Upstream closed or errored; a retry may follow.
    Disconnected,
    /// Waiting out a backoff delay before the next attempt.
    Reconnecting,
    /// Retry budget exhausted; inert until an explicit restart.
    Failed,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Exchange wire format (e.g. "BUY").
    pub fn as_wire(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// The type of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_wire(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        }
    }
}

/// A caller-facing trade submission. Transient; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    /// Human-readable pair, e.g. "BTC/USDT". Must be in the symbol map.
    pub pair: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Limit price; ignored for market orders.
    pub price: Option<Decimal>,
}

/// Outcome of a trade submission. Business-rule rejections (unmapped
/// pair, missing credentials, upstream refusal) are values, not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TradeResult {
    Accepted {
        order_id: String,
        status: String,
        exchange: Exchange,
    },
    Rejected {
        reason: String,
    },
}

impl TradeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TradeResult::Accepted { .. })
    }
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

/// A non-zero balance held on an exchange account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioPosition {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
    pub total: Decimal,
}

/// Snapshot of exchange account balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub positions: Vec<PortfolioPosition>,
    pub last_updated: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Result of probing an exchange's public status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeResult {
    Online { latency_ms: u64 },
    Offline,
}

impl ProbeResult {
    pub fn is_online(&self) -> bool {
        matches!(self, ProbeResult::Online { .. })
    }
}

/// Snapshot of which data sources are active and which exchanges hold
/// credentials. Returned by the coordinator's status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStatus {
    /// True while the polling loop is scheduled.
    pub poll_active: bool,
    pub stream_state: FeedState,
    pub credentials: Vec<CredentialStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_round_trips_from_str() {
        for exchange in Exchange::ALL {
            let parsed: Exchange = exchange.as_str().parse().unwrap();
            assert_eq!(parsed, exchange);
        }
        assert!("kraken".parse::<Exchange>().is_err());
    }

    #[test]
    fn coinbase_requires_passphrase() {
        assert!(Exchange::Coinbase
            .required_fields()
            .contains(&CredentialField::Passphrase));
        assert!(!Exchange::Binance
            .required_fields()
            .contains(&CredentialField::Passphrase));
    }

    #[test]
    fn trade_result_success_flag() {
        let accepted = TradeResult::Accepted {
            order_id: "1".to_string(),
            status: "DEMO_ORDER".to_string(),
            exchange: Exchange::Binance,
        };
        assert!(accepted.is_success());

        let rejected = TradeResult::Rejected {
            reason: "nope".to_string(),
        };
        assert!(!rejected.is_success());
    }
}
