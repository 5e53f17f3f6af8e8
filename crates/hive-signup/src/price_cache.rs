//! Process-wide HIVE/USD rate cache.
//!
//! Keeps the last good rate. A failed refresh never clears it, and a rate of
//! `0` means no fetch has ever succeeded.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::constants::{unix_millis, DEFAULT_PRICE_REFRESH_INTERVAL, PRICE_RETRY_BACKOFF};
use crate::error::SignupError;
use crate::price_feed::{validate_rate, PriceFeed};

/// Rate and the time (Unix ms) it was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub usd: f64,
    pub last_updated: i64,
}

impl PriceSnapshot {
    /// `true` once a usable rate has been observed.
    pub fn is_known(&self) -> bool {
        self.usd.is_finite() && self.usd > 0.0
    }

    pub fn is_stale(&self, now_ms: i64, interval: Duration) -> bool {
        now_ms.saturating_sub(self.last_updated) > interval.as_millis() as i64
    }
}

pub struct PriceCache<F> {
    feed: F,
    snapshot: RwLock<PriceSnapshot>,
    /// Serializes refreshes. Holds the time (Unix ms) the last attempt
    /// finished, successful or not.
    refresh_lock: Mutex<i64>,
    interval: Duration,
}

impl<F: PriceFeed> PriceCache<F> {
    pub fn new(feed: F) -> Self {
        Self::with_interval(feed, DEFAULT_PRICE_REFRESH_INTERVAL)
    }

    pub fn with_interval(feed: F, interval: Duration) -> Self {
        Self {
            feed,
            snapshot: RwLock::new(PriceSnapshot::default()),
            refresh_lock: Mutex::new(0),
            interval,
        }
    }

    /// Seed the cache, e.g. with a value restored from elsewhere.
    pub fn with_snapshot(self, snapshot: PriceSnapshot) -> Self {
        self.store(snapshot);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current rate and fetch time.
    pub fn snapshot(&self) -> PriceSnapshot {
        match self.snapshot.read() {
            Ok(s) => *s,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.snapshot().is_stale(unix_millis(), self.interval)
    }

    /// Fetch a fresh rate. On failure the previous snapshot is kept.
    pub async fn refresh(&self) -> Result<PriceSnapshot, SignupError> {
        let mut last_attempt = self.refresh_lock.lock().await;
        let result = self.fetch_and_store().await;
        *last_attempt = unix_millis();
        result
    }

    /// Refresh only if the cached rate is older than the interval.
    ///
    /// Callers racing on a stale cache share one attempt: whoever waited on
    /// the lock while another attempt ran gets the cached value, even if that
    /// attempt failed. After an attempt, the read path does not fetch again
    /// for a short backoff. Errors are logged and the cached value returned.
    pub async fn refresh_if_stale(&self) -> PriceSnapshot {
        if !self.is_stale() {
            return self.snapshot();
        }

        let requested_at = unix_millis();
        let mut last_attempt = self.refresh_lock.lock().await;
        if !self.is_stale() || *last_attempt >= requested_at {
            return self.snapshot();
        }
        if unix_millis().saturating_sub(*last_attempt) < self.retry_backoff_ms() {
            return self.snapshot();
        }

        let result = self.fetch_and_store().await;
        *last_attempt = unix_millis();
        result.unwrap_or_else(|_| self.snapshot())
    }

    fn retry_backoff_ms(&self) -> i64 {
        self.interval.min(PRICE_RETRY_BACKOFF).as_millis() as i64
    }

    async fn fetch_and_store(&self) -> Result<PriceSnapshot, SignupError> {
        let usd = match self.feed.fetch_usd_price().await.and_then(validate_rate) {
            Ok(usd) => usd,
            Err(e) => {
                let previous = self.snapshot();
                tracing::warn!(
                    error = %e,
                    cached_usd = previous.usd,
                    cached_at = previous.last_updated,
                    "HIVE price refresh failed, keeping last known rate"
                );
                return Err(e);
            }
        };

        let fetched = PriceSnapshot {
            usd,
            last_updated: unix_millis(),
        };
        self.store(fetched);
        tracing::info!(usd, "updated HIVE price");
        Ok(self.snapshot())
    }

    /// Last writer wins, but never moves the timestamp backwards.
    fn store(&self, next: PriceSnapshot) {
        let mut current = match self.snapshot.write() {
            Ok(s) => s,
            Err(poisoned) => {
                tracing::error!("price cache lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        if next.last_updated >= current.last_updated {
            *current = next;
        }
    }
}

impl<F> PriceCache<F>
where
    F: PriceFeed + 'static,
{
    /// Spawn the periodic refresh loop. The first tick fires after one
    /// interval; callers wanting a warm cache should `refresh()` first.
    pub fn spawn_refresh_task(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + cache.interval;
            let mut ticker = tokio::time::interval_at(start, cache.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Failures are logged inside; the old rate stays in place.
                let _ = cache.refresh().await;
            }
        })
    }
}
