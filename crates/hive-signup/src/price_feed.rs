//! Upstream HIVE/USD rate sources.

use std::time::Duration;

use serde::Deserialize;

use crate::constants::COINGECKO_PRICE_URL;
use crate::error::SignupError;

/// Source of the current HIVE price in USD.
pub trait PriceFeed: Send + Sync {
    /// Fetch the current rate. Must only return finite, positive values.
    fn fetch_usd_price(&self) -> impl std::future::Future<Output = Result<f64, SignupError>> + Send;
}

#[derive(Deserialize)]
struct SimplePrice {
    hive: HiveQuote,
}

#[derive(Deserialize)]
struct HiveQuote {
    usd: f64,
}

/// CoinGecko `simple/price` client.
#[derive(Clone)]
pub struct CoinGeckoFeed {
    client: reqwest::Client,
    url: String,
}

impl CoinGeckoFeed {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_url(client, COINGECKO_PRICE_URL)
    }

    pub fn with_url(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl PriceFeed for CoinGeckoFeed {
    async fn fetch_usd_price(&self) -> Result<f64, SignupError> {
        let resp = self
            .client
            .get(&self.url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| SignupError::UpstreamUnavailable(format!("price feed: {e}")))?;

        if !resp.status().is_success() {
            return Err(SignupError::UpstreamUnavailable(format!(
                "price feed returned {}",
                resp.status()
            )));
        }

        let body: SimplePrice = resp
            .json()
            .await
            .map_err(|e| SignupError::UpstreamUnavailable(format!("price feed body: {e}")))?;

        validate_rate(body.hive.usd)
    }
}

/// Reject rates that would poison the cache.
pub fn validate_rate(usd: f64) -> Result<f64, SignupError> {
    if usd.is_finite() && usd > 0.0 {
        Ok(usd)
    } else {
        Err(SignupError::UpstreamUnavailable(format!(
            "price feed reported unusable rate {usd}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_price_body() {
        let body: SimplePrice = serde_json::from_str(r#"{"hive":{"usd":0.2374}}"#).unwrap();
        assert_eq!(body.hive.usd, 0.2374);
    }

    #[test]
    fn rejects_unusable_rates() {
        assert!(validate_rate(0.0).is_err());
        assert!(validate_rate(-1.0).is_err());
        assert!(validate_rate(f64::INFINITY).is_err());
        assert!(validate_rate(f64::NAN).is_err());
        assert_eq!(validate_rate(0.31).unwrap(), 0.31);
    }
}
