/// Errors surfaced by the integration layer.
///
/// Transient variants (`Network`, `Timeout`, `Http`) are retried only by
/// the feed's own poll/reconnect cadence; trade and portfolio calls
/// surface them to the caller once.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Bad input shape. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Missing or unusable credentials. Never retried.
    #[error("not configured: {0}")]
    Configuration(String),
    /// Transport-level failure reaching the upstream.
    #[error("network error: {0}")]
    Network(String),
    /// The request deadline elapsed before the upstream responded.
    #[error("request timed out - API server not responding")]
    Timeout,
    /// The upstream answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// The upstream answered with a payload we could not decode.
    #[error("malformed payload: {0}")]
    Parse(String),
}

impl BridgeError {
    /// Whether the feed's retry cadence may eventually recover from
    /// this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BridgeError::Network(_) | BridgeError::Timeout | BridgeError::Http { .. }
        )
    }
}
