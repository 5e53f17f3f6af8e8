use std::time::Duration;

/// Ticker of the native token quoted and accepted for paid signups.
pub const HIVE_SYMBOL: &str = "HIVE";

/// HIVE amounts carry three decimal places (milli-HIVE precision).
pub const HIVE_DECIMALS: u32 = 3;

/// Default USD price of a paid account.
pub const DEFAULT_PAID_ACCOUNT_PRICE_CENTS: u64 = 300;

/// Default lower safety bound for a quote: 1.000 HIVE.
pub const DEFAULT_MIN_HIVE_MILLI: u64 = 1_000;

/// Default upper safety bound for a quote: 10.000 HIVE.
pub const DEFAULT_MAX_HIVE_MILLI: u64 = 10_000;

/// Default interval between background price refreshes.
pub const DEFAULT_PRICE_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Read-path refreshes are not retried sooner than this after an attempt,
/// capped at the refresh interval.
pub const PRICE_RETRY_BACKOFF: Duration = Duration::from_secs(30);

/// Public CoinGecko endpoint for the HIVE/USD rate.
pub const COINGECKO_PRICE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=hive&vs_currencies=usd";

/// Public Hive API nodes, tried in order.
pub const DEFAULT_HIVE_API_NODES: &[&str] = &[
    "https://api.hive.blog",
    "https://api.deathwing.me",
    "https://rpc.ausbit.dev",
    "https://hive-api.3speak.tv",
];

/// Verification codes for free accounts are drawn from this inclusive range.
pub const VERIFICATION_CODE_MIN: u32 = 100_000;
pub const VERIFICATION_CODE_MAX: u32 = 999_999;

/// Default timeout for the downstream account-creation call.
pub const DEFAULT_ACCOUNT_CREATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Current Unix time in milliseconds.
pub fn unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
