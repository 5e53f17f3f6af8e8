//! Payment-widget parameters handed to the client for paid signups.

use serde::Serialize;

use crate::account::ReferenceId;
use crate::amount::{HiveAmount, UsdAmount};
use crate::constants::HIVE_SYMBOL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WidgetEnvironment {
    Production,
    Staging,
}

impl WidgetEnvironment {
    /// `production` (any case) selects PRODUCTION; anything else is STAGING.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("production") {
            WidgetEnvironment::Production
        } else {
            WidgetEnvironment::Staging
        }
    }
}

/// Static widget settings shared by every paid signup.
#[derive(Clone)]
pub struct WidgetConfig {
    pub api_key: Option<String>,
    pub environment: WidgetEnvironment,
    /// Hive account that receives payments.
    pub receiving_account: String,
    /// Public base URL the widget redirects back to.
    pub base_url: String,
}

impl std::fmt::Debug for WidgetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("environment", &self.environment)
            .field("receiving_account", &self.receiving_account)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Transak widget parameters. The reference id travels as the memo.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
    pub api_key: Option<String>,
    pub environment: WidgetEnvironment,
    pub crypto_currency_code: &'static str,
    pub network: &'static str,
    pub wallet_address: String,
    pub memo: ReferenceId,
    pub default_crypto_currency: &'static str,
    pub fiat_amount: UsdAmount,
    pub fiat_currency: &'static str,
    #[serde(rename = "redirectURL")]
    pub redirect_url: String,
}

impl WidgetConfig {
    /// Shape the widget parameters for one paid signup. No side effects.
    pub fn instructions(&self, reference_id: &ReferenceId, fiat_amount: UsdAmount) -> PaymentInstructions {
        PaymentInstructions {
            api_key: self.api_key.clone(),
            environment: self.environment,
            crypto_currency_code: HIVE_SYMBOL,
            network: "mainnet",
            wallet_address: self.receiving_account.clone(),
            memo: reference_id.clone(),
            default_crypto_currency: HIVE_SYMBOL,
            fiat_amount,
            fiat_currency: "USD",
            redirect_url: format!(
                "{}/complete-signup/{}",
                self.base_url.trim_end_matches('/'),
                reference_id
            ),
        }
    }
}

/// Frozen pricing returned alongside a paid signup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    pub usd: UsdAmount,
    pub hive: HiveAmount,
    pub hive_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WidgetConfig {
        WidgetConfig {
            api_key: Some("pk_test".to_string()),
            environment: WidgetEnvironment::from_name("development"),
            receiving_account: "signup.hive".to_string(),
            base_url: "https://signup.example.com/".to_string(),
        }
    }

    #[test]
    fn instructions_carry_reference_as_memo() {
        let id = ReferenceId::from("abc123");
        let v = serde_json::to_value(config().instructions(&id, UsdAmount::from_cents(300))).unwrap();
        assert_eq!(v["memo"], "abc123");
        assert_eq!(v["walletAddress"], "signup.hive");
        assert_eq!(v["environment"], "STAGING");
        assert_eq!(v["cryptoCurrencyCode"], "HIVE");
        assert_eq!(v["defaultCryptoCurrency"], "HIVE");
        assert_eq!(v["network"], "mainnet");
        assert_eq!(v["fiatAmount"], 3.0);
        assert_eq!(v["fiatCurrency"], "USD");
        assert_eq!(
            v["redirectURL"],
            "https://signup.example.com/complete-signup/abc123"
        );
    }

    #[test]
    fn environment_names() {
        assert_eq!(WidgetEnvironment::from_name("production"), WidgetEnvironment::Production);
        assert_eq!(WidgetEnvironment::from_name("PRODUCTION"), WidgetEnvironment::Production);
        assert_eq!(WidgetEnvironment::from_name(""), WidgetEnvironment::Staging);
    }

    #[test]
    fn debug_redacts_api_key() {
        let dbg = format!("{:?}", config());
        assert!(!dbg.contains("pk_test"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
