use std::env;
use std::time::Duration;

use hive_signup::constants::{
    COINGECKO_PRICE_URL, DEFAULT_ACCOUNT_CREATION_TIMEOUT, DEFAULT_HIVE_API_NODES,
    DEFAULT_MAX_HIVE_MILLI, DEFAULT_MIN_HIVE_MILLI, DEFAULT_PAID_ACCOUNT_PRICE_CENTS,
    DEFAULT_PRICE_REFRESH_INTERVAL,
};
use hive_signup::{
    AmountBounds, HiveAmount, PricingConfig, UsdAmount, WidgetConfig, WidgetEnvironment,
};
use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_PATH: &str = "./accounts.db";
const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_RATE_LIMIT_RPM: u32 = 60;

#[derive(Clone)]
pub struct SignupConfig {
    pub port: u16,
    /// SQLite ledger path
    pub db_path: String,
    /// USD price of a paid account
    pub paid_account_price: UsdAmount,
    pub price_update_interval: Duration,
    /// Safety bounds for HIVE quotes
    pub bounds: AmountBounds,
    pub price_feed_url: String,
    /// Hive API nodes for username availability, tried in order
    pub hive_api_nodes: Vec<String>,
    /// Hive account that receives payments
    pub receiving_account: String,
    /// Public base URL used for widget redirects
    pub base_url: String,
    pub transak_api_key: Option<String>,
    pub environment: WidgetEnvironment,
    /// Endpoint that creates the on-chain account after payment
    pub account_creator_url: String,
    /// HMAC secret for signing account-creation requests (None = unsigned)
    pub account_creator_secret: Option<Vec<u8>>,
    pub account_creator_timeout: Duration,
    pub allowed_origins: Vec<String>,
    pub rate_limit_rpm: u32,
    /// Bearer token required for /metrics (None = public)
    pub metrics_token: Option<String>,
    /// Bearer token for /api/admin (None = admin API disabled)
    pub admin_token: Option<String>,
}

impl std::fmt::Debug for SignupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupConfig")
            .field("port", &self.port)
            .field("db_path", &self.db_path)
            .field("paid_account_price", &self.paid_account_price)
            .field("price_update_interval", &self.price_update_interval)
            .field("bounds", &self.bounds)
            .field("price_feed_url", &self.price_feed_url)
            .field("hive_api_nodes", &self.hive_api_nodes)
            .field("receiving_account", &self.receiving_account)
            .field("base_url", &self.base_url)
            .field(
                "transak_api_key",
                &self.transak_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("environment", &self.environment)
            .field("account_creator_url", &self.account_creator_url)
            .field(
                "account_creator_secret",
                &self.account_creator_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("account_creator_timeout", &self.account_creator_timeout)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "admin_token",
                &self.admin_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl SignupConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the config from any variable source. Empty values count as unset.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Required: receiving account and account-creation endpoint
        let receiving_account =
            var("HIVE_RECEIVING_ACCOUNT").ok_or(ConfigError::MissingRequired("HIVE_RECEIVING_ACCOUNT"))?;
        let account_creator_url =
            var("ACCOUNT_CREATOR_URL").ok_or(ConfigError::MissingRequired("ACCOUNT_CREATOR_URL"))?;
        Url::parse(&account_creator_url)
            .map_err(|_| ConfigError::InvalidUrl(account_creator_url.clone()))?;

        let port = var("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let db_path = var("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let paid_account_price = match var("PAID_ACCOUNT_PRICE_USD") {
            Some(s) => s.parse::<UsdAmount>().map_err(|e| ConfigError::InvalidAmount {
                var: "PAID_ACCOUNT_PRICE_USD",
                reason: e.to_string(),
            })?,
            None => UsdAmount::from_cents(DEFAULT_PAID_ACCOUNT_PRICE_CENTS),
        };

        let price_update_interval = var("PRICE_UPDATE_INTERVAL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PRICE_REFRESH_INTERVAL);

        let min = hive_amount(&var, "MIN_HIVE_AMOUNT", DEFAULT_MIN_HIVE_MILLI)?;
        let max = hive_amount(&var, "MAX_HIVE_AMOUNT", DEFAULT_MAX_HIVE_MILLI)?;
        let bounds =
            AmountBounds::new(min, max).map_err(|e| ConfigError::InvalidBounds(e.to_string()))?;

        let price_feed_url =
            var("PRICE_FEED_URL").unwrap_or_else(|| COINGECKO_PRICE_URL.to_string());
        Url::parse(&price_feed_url).map_err(|_| ConfigError::InvalidUrl(price_feed_url.clone()))?;

        let hive_api_nodes: Vec<String> = var("HIVE_API_NODES")
            .map(|s| {
                s.split(',')
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_HIVE_API_NODES.iter().map(|n| n.to_string()).collect());
        for node in &hive_api_nodes {
            Url::parse(node).map_err(|_| ConfigError::InvalidUrl(node.clone()))?;
        }

        let base_url = var("BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Url::parse(&base_url).map_err(|_| ConfigError::InvalidUrl(base_url.clone()))?;

        let transak_api_key = var("TRANSAK_API_KEY");
        let environment = WidgetEnvironment::from_name(&var("SIGNUP_ENVIRONMENT").unwrap_or_default());

        let account_creator_secret = var("ACCOUNT_CREATOR_SECRET").map(String::into_bytes);
        let account_creator_timeout = var("ACCOUNT_CREATOR_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ACCOUNT_CREATION_TIMEOUT);

        let allowed_origins: Vec<String> = var("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec![DEFAULT_BASE_URL.to_string()]);

        let rate_limit_rpm = var("RATE_LIMIT_RPM")
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|rpm| *rpm > 0)
            .unwrap_or(DEFAULT_RATE_LIMIT_RPM);

        let metrics_token = var("METRICS_TOKEN");
        let admin_token = var("ADMIN_TOKEN");

        if account_creator_secret.is_none() {
            tracing::warn!(
                "ACCOUNT_CREATOR_SECRET not set, account-creation requests will be unsigned"
            );
        }
        if transak_api_key.is_none() {
            tracing::warn!("TRANSAK_API_KEY not set, payment widget will not load");
        }
        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set, /metrics endpoint is publicly accessible");
        }
        if admin_token.is_none() {
            tracing::info!("ADMIN_TOKEN not set, admin endpoints are disabled");
        }

        Ok(Self {
            port,
            db_path,
            paid_account_price,
            price_update_interval,
            bounds,
            price_feed_url,
            hive_api_nodes,
            receiving_account,
            base_url,
            transak_api_key,
            environment,
            account_creator_url,
            account_creator_secret,
            account_creator_timeout,
            allowed_origins,
            rate_limit_rpm,
            metrics_token,
            admin_token,
        })
    }

    pub fn pricing(&self) -> PricingConfig {
        PricingConfig {
            paid_account_price: self.paid_account_price,
            bounds: self.bounds,
        }
    }

    pub fn widget(&self) -> WidgetConfig {
        WidgetConfig {
            api_key: self.transak_api_key.clone(),
            environment: self.environment,
            receiving_account: self.receiving_account.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

fn hive_amount(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default_milli: u64,
) -> Result<HiveAmount, ConfigError> {
    match var(key) {
        Some(s) => s.parse::<HiveAmount>().map_err(|e| ConfigError::InvalidAmount {
            var: key,
            reason: e.to_string(),
        }),
        None => Ok(HiveAmount::from_milli(default_milli)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid amount in {var}: {reason}")]
    InvalidAmount { var: &'static str, reason: String },

    #[error("invalid HIVE bounds: {0}")]
    InvalidBounds(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<SignupConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SignupConfig::from_vars(|k| vars.get(k).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("HIVE_RECEIVING_ACCOUNT", "signup.hive"),
        ("ACCOUNT_CREATOR_URL", "https://creator.internal/create"),
    ];

    #[test]
    fn defaults_apply() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, "./accounts.db");
        assert_eq!(config.paid_account_price.cents(), 300);
        assert_eq!(config.price_update_interval, Duration::from_secs(300));
        assert_eq!(config.bounds.min().milli(), 1_000);
        assert_eq!(config.bounds.max().milli(), 10_000);
        assert_eq!(config.hive_api_nodes.len(), 4);
        assert_eq!(config.environment, WidgetEnvironment::Staging);
        assert_eq!(config.account_creator_timeout, Duration::from_secs(30));
        assert_eq!(config.rate_limit_rpm, 60);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn missing_required_is_reported() {
        let err = load(&[("ACCOUNT_CREATOR_URL", "https://creator.internal")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired("HIVE_RECEIVING_ACCOUNT")));

        let err = load(&[("HIVE_RECEIVING_ACCOUNT", "signup.hive")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired("ACCOUNT_CREATOR_URL")));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("PAID_ACCOUNT_PRICE_USD", "$5.50"),
            ("MIN_HIVE_AMOUNT", "0.5"),
            ("MAX_HIVE_AMOUNT", "20.000"),
            ("HIVE_API_NODES", "https://a.example, https://b.example"),
            ("SIGNUP_ENVIRONMENT", "production"),
            ("ACCOUNT_CREATOR_TIMEOUT_SECS", "5"),
            ("ALLOWED_ORIGINS", "https://a.example,https://b.example"),
        ]);
        let config = load(&pairs).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.paid_account_price.cents(), 550);
        assert_eq!(config.bounds.min().milli(), 500);
        assert_eq!(config.bounds.max().milli(), 20_000);
        assert_eq!(config.hive_api_nodes, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.environment, WidgetEnvironment::Production);
        assert_eq!(config.account_creator_timeout, Duration::from_secs(5));
        assert_eq!(config.allowed_origins.len(), 2);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MIN_HIVE_AMOUNT", "20"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidBounds(_))));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PAID_ACCOUNT_PRICE_USD", "three"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidAmount { .. })));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BASE_URL", "not a url"));
        assert!(matches!(load(&pairs), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("ACCOUNT_CREATOR_SECRET", "creator-secret-value"),
            ("ADMIN_TOKEN", "admin-token-value"),
            ("TRANSAK_API_KEY", "transak-key-value"),
        ]);
        let dbg = format!("{:?}", load(&pairs).unwrap());
        assert!(!dbg.contains("creator-secret-value"));
        assert!(!dbg.contains("admin-token-value"));
        assert!(!dbg.contains("transak-key-value"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
