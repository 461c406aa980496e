use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use tradrx_core::BridgeError;

/// Hard deadline for any single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Calls slower than this are flagged in the log but not failed.
const SLOW_CALL_THRESHOLD: Duration = Duration::from_secs(5);

/// Thin wrapper over reqwest that applies the bridge's fixed timeout,
/// fixed headers, uniform error translation, and sanitized logging.
/// Credentials are never attached here; authenticated calls are an
/// explicit non-goal of this client.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
}

impl RestClient {
    pub fn new() -> Result<Self, BridgeError> {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("User-Agent", HeaderValue::from_static("TradrXBridge/2.1"));
        headers.insert(
            "X-Requested-With",
            HeaderValue::from_static("XMLHttpRequest"),
        );
        headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
        headers.insert("Pragma", HeaderValue::from_static("no-cache"));

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        Ok(Self { http })
    }

    /// GET `url` and decode the JSON response body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BridgeError> {
        let started = Instant::now();
        let result = self.get_json_inner(url).await;
        let elapsed = started.elapsed();

        if elapsed > SLOW_CALL_THRESHOLD {
            warn!(
                url = %sanitize_url(url),
                elapsed_ms = elapsed.as_millis() as u64,
                "Slow API request"
            );
        } else {
            debug!(
                url = %sanitize_url(url),
                elapsed_ms = elapsed.as_millis() as u64,
                "API request complete"
            );
        }

        if let Err(e) = &result {
            error!(url = %sanitize_url(url), error = %e, "API request failed");
        }
        result
    }

    async fn get_json_inner<T: DeserializeOwned>(&self, url: &str) -> Result<T, BridgeError> {
        let response = self.http.get(url).send().await.map_err(translate)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BridgeError::Parse(e.to_string()))
    }
}

fn translate(err: reqwest::Error) -> BridgeError {
    if err.is_timeout() {
        BridgeError::Timeout
    } else {
        BridgeError::Network(err.to_string())
    }
}

/// Redact sensitive query-parameter values before a URL reaches any
/// log line.
pub fn sanitize_url(url: &str) -> String {
    const REDACTED_PARAMS: [&str; 3] = ["api_key", "secret", "signature"];

    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let sanitized: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if REDACTED_PARAMS.contains(&name) => format!("{name}=***"),
            _ => pair.to_string(),
        })
        .collect();

    format!("{base}?{}", sanitized.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_redacts_sensitive_params() {
        let url = "https://api.example.com/order?symbol=BTCUSDT&api_key=abc123&secret=xyz&signature=deadbeef";
        let clean = sanitize_url(url);
        assert_eq!(
            clean,
            "https://api.example.com/order?symbol=BTCUSDT&api_key=***&secret=***&signature=***"
        );
    }

    #[test]
    fn sanitize_leaves_plain_urls_alone() {
        let url = "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";
        assert_eq!(sanitize_url(url), url);

        let no_query = "https://api.binance.com/api/v3/ping";
        assert_eq!(sanitize_url(no_query), no_query);
    }

    #[test]
    fn sanitize_handles_valueless_params() {
        let url = "https://api.example.com/x?flag&api_key=topsecret";
        assert_eq!(sanitize_url(url), "https://api.example.com/x?flag&api_key=***");
    }
}
