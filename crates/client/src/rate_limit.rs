use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use tradrx_core::Provider;

/// Minimum spacing between requests to the same provider endpoint.
/// Binance tolerates a higher request rate than the free CoinGecko
/// tier.
pub fn min_interval(provider: Provider) -> Duration {
    match provider {
        Provider::CoinGecko => Duration::from_millis(1000),
        Provider::Binance => Duration::from_millis(500),
        Provider::Coinbase => Duration::from_millis(1000),
    }
}

/// Per-provider/per-endpoint minimum-interval gate.
///
/// `acquire` never fails; it suspends the caller until the interval
/// since the previous acquire for the same pair has elapsed. Burst
/// budgets beyond the single interval are not modeled.
pub struct RateLimiter {
    last_call: Mutex<HashMap<(Provider, &'static str), Instant>>,
    overrides: HashMap<Provider, Duration>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            last_call: Mutex::new(HashMap::new()),
            overrides: HashMap::new(),
        }
    }

    /// Replace the default interval for one provider.
    pub fn with_interval(mut self, provider: Provider, interval: Duration) -> Self {
        self.overrides.insert(provider, interval);
        self
    }

    fn interval_for(&self, provider: Provider) -> Duration {
        self.overrides
            .get(&provider)
            .copied()
            .unwrap_or_else(|| min_interval(provider))
    }

    /// Wait until a request to `(provider, endpoint)` is allowed, then
    /// record the slot as taken.
    pub async fn acquire(&self, provider: Provider, endpoint: &'static str) {
        let interval = self.interval_for(provider);

        // Reserve the next slot under the lock, sleep outside it so
        // other provider/endpoint pairs are not held up.
        let ready_at = {
            let mut last_call = self.last_call.lock().await;
            let now = Instant::now();
            let ready_at = match last_call.get(&(provider, endpoint)) {
                Some(&last) if last + interval > now => last + interval,
                _ => now,
            };
            last_call.insert((provider, endpoint), ready_at);
            ready_at
        };

        let wait = ready_at.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            debug!(
                provider = %provider,
                endpoint,
                wait_ms = wait.as_millis() as u64,
                "Rate limiting request"
            );
            tokio::time::sleep_until(ready_at).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn consecutive_acquires_are_spaced_by_interval() {
        let limiter = RateLimiter::new();

        let start = Instant::now();
        limiter.acquire(Provider::CoinGecko, "prices").await;
        limiter.acquire(Provider::CoinGecko, "prices").await;
        limiter.acquire(Provider::CoinGecko, "prices").await;

        // Two waits of 1000ms each after the free first call.
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_endpoints_do_not_block_each_other() {
        let limiter = RateLimiter::new();

        let start = Instant::now();
        limiter.acquire(Provider::CoinGecko, "prices").await;
        limiter.acquire(Provider::CoinGecko, "markets").await;
        limiter.acquire(Provider::Binance, "ticker").await;

        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn binance_uses_shorter_interval() {
        let limiter = RateLimiter::new();

        let start = Instant::now();
        limiter.acquire(Provider::Binance, "ticker").await;
        limiter.acquire(Provider::Binance, "ticker").await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn override_interval_applies() {
        let limiter =
            RateLimiter::new().with_interval(Provider::CoinGecko, Duration::from_millis(50));

        let start = Instant::now();
        limiter.acquire(Provider::CoinGecko, "prices").await;
        limiter.acquire(Provider::CoinGecko, "prices").await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_interval_passes_immediately() {
        let limiter = RateLimiter::new();
        limiter.acquire(Provider::CoinGecko, "prices").await;

        tokio::time::advance(Duration::from_millis(1500)).await;

        let start = Instant::now();
        limiter.acquire(Provider::CoinGecko, "prices").await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }
}
