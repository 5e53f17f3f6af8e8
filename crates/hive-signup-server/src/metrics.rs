use hive_signup::{PriceFeed, SignupError};
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Signup counters
pub static SIGNUPS_INITIATED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("signup_accounts_initiated_total", "Signups initiated by account type"),
        &["account_type"],
    )
    .expect("valid metric definition")
});

// Payment webhook counters
pub static PAYMENT_EVENTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("signup_payment_events_total", "Payment events by reconciliation result"),
        &["result"],
    )
    .expect("valid metric definition")
});

pub static ACCOUNT_CREATION_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "signup_account_creation_failures_total",
        "Paid signups whose account creation failed",
    )
    .expect("valid metric definition")
});

// Pricing counters
pub static QUOTES_CLAMPED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("signup_quotes_clamped_total", "HIVE quotes forced onto a safety bound"),
        &["bound"],
    )
    .expect("valid metric definition")
});

pub static PRICE_REFRESHES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("signup_price_refreshes_total", "Price feed fetches by result"),
        &["result"],
    )
    .expect("valid metric definition")
});

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(SIGNUPS_INITIATED.clone()),
        Box::new(PAYMENT_EVENTS.clone()),
        Box::new(ACCOUNT_CREATION_FAILURES.clone()),
        Box::new(QUOTES_CLAMPED.clone()),
        Box::new(PRICE_REFRESHES.clone()),
    ];
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Price feed wrapper that counts fetch outcomes.
pub struct MeteredFeed<F> {
    inner: F,
}

impl<F> MeteredFeed<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: PriceFeed> PriceFeed for MeteredFeed<F> {
    async fn fetch_usd_price(&self) -> Result<f64, SignupError> {
        let result = self.inner.fetch_usd_price().await;
        let label = if result.is_ok() { "ok" } else { "error" };
        PRICE_REFRESHES.with_label_values(&[label]).inc();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Down;

    impl PriceFeed for Down {
        async fn fetch_usd_price(&self) -> Result<f64, SignupError> {
            Err(SignupError::UpstreamUnavailable("down".to_string()))
        }
    }

    #[test]
    fn registration_is_idempotent() {
        register_metrics().unwrap();
        register_metrics().unwrap();
    }

    #[tokio::test]
    async fn metered_feed_counts_failures() {
        let before = PRICE_REFRESHES.with_label_values(&["error"]).get();
        let feed = MeteredFeed::new(Down);
        assert!(feed.fetch_usd_price().await.is_err());
        assert!(PRICE_REFRESHES.with_label_values(&["error"]).get() > before);
    }
}
