//! Signup initiation: validate the name, price the account, persist the record.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;

use crate::account::{AccountTerms, AccountType, PaidTerms, PendingAccount, ReferenceId};
use crate::amount::UsdAmount;
use crate::constants::{
    unix_millis, DEFAULT_PAID_ACCOUNT_PRICE_CENTS, VERIFICATION_CODE_MAX, VERIFICATION_CODE_MIN,
};
use crate::error::SignupError;
use crate::ledger::Ledger;
use crate::naming::NameService;
use crate::price_cache::PriceCache;
use crate::price_feed::PriceFeed;
use crate::pricing::{calculate, AmountBounds, Quote};
use crate::widget::{PaymentInstructions, PricingBreakdown, WidgetConfig};

/// Price point and safety bounds for paid accounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingConfig {
    pub paid_account_price: UsdAmount,
    pub bounds: AmountBounds,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            paid_account_price: UsdAmount::from_cents(DEFAULT_PAID_ACCOUNT_PRICE_CENTS),
            bounds: AmountBounds::default(),
        }
    }
}

/// Result of [`Provisioner::init_account`].
///
/// Serializes as the record fields plus `paymentInstructions` and `pricing`
/// for paid signups.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitAccount {
    #[serde(flatten)]
    pub account: PendingAccount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_instructions: Option<PaymentInstructions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<PricingBreakdown>,
    #[serde(skip)]
    pub quote: Option<Quote>,
}

impl InitAccount {
    pub fn reference_id(&self) -> &ReferenceId {
        &self.account.reference_id
    }
}

pub struct Provisioner<F, N> {
    ledger: Arc<dyn Ledger>,
    prices: Arc<PriceCache<F>>,
    names: N,
    pricing: PricingConfig,
    widget: WidgetConfig,
}

impl<F: PriceFeed, N: NameService> Provisioner<F, N> {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        prices: Arc<PriceCache<F>>,
        names: N,
        pricing: PricingConfig,
        widget: WidgetConfig,
    ) -> Self {
        Self {
            ledger,
            prices,
            names,
            pricing,
            widget,
        }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub fn prices(&self) -> &Arc<PriceCache<F>> {
        &self.prices
    }

    /// Quote the configured USD price at the current (possibly refreshed) rate.
    pub async fn current_quote(&self) -> (Quote, crate::price_cache::PriceSnapshot) {
        let snapshot = self.prices.refresh_if_stale().await;
        let quote = calculate(self.pricing.paid_account_price, &snapshot, &self.pricing.bounds);
        (quote, snapshot)
    }

    /// Start a signup for `username`.
    ///
    /// Paid signups freeze the quoted HIVE amount and the rate it was computed
    /// at; neither is recomputed later.
    pub async fn init_account(
        &self,
        username: &str,
        account_type: AccountType,
    ) -> Result<InitAccount, SignupError> {
        if username.is_empty() {
            return Err(SignupError::InvalidUsername("username is required".to_string()));
        }

        self.names.validate(username).await?;

        let reference_id = ReferenceId::generate();

        let (terms, quote) = match account_type {
            AccountType::Free => (
                AccountTerms::Free {
                    verification_code: generate_verification_code(),
                },
                None,
            ),
            AccountType::Paid => {
                let (quote, snapshot) = self.current_quote().await;
                let terms = PaidTerms {
                    payment_amount_usd: self.pricing.paid_account_price,
                    payment_amount_hive: quote.amount,
                    hive_price_snapshot: snapshot.usd,
                };
                (AccountTerms::Paid(terms), Some(quote))
            }
        };

        let account = PendingAccount::new(reference_id, username.to_string(), terms, unix_millis());
        self.ledger.create(&account)?;

        let (payment_instructions, pricing) = match account.terms.paid() {
            Some(paid) => (
                Some(self.widget.instructions(&account.reference_id, paid.payment_amount_usd)),
                Some(PricingBreakdown {
                    usd: paid.payment_amount_usd,
                    hive: paid.payment_amount_hive,
                    hive_price: paid.hive_price_snapshot,
                }),
            ),
            None => (None, None),
        };

        tracing::info!(
            reference_id = %account.reference_id,
            username = %account.username,
            account_type = account_type.as_str(),
            hive_milli = pricing.map(|p| p.hive.milli()),
            "signup initiated"
        );

        Ok(InitAccount {
            account,
            payment_instructions,
            pricing,
            quote,
        })
    }
}

/// Uniform 6-digit code in `[100000, 999999]`.
fn generate_verification_code() -> String {
    rand::rng()
        .random_range(VERIFICATION_CODE_MIN..=VERIFICATION_CODE_MAX)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_codes_are_six_digits_in_range() {
        for _ in 0..1_000 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((VERIFICATION_CODE_MIN..=VERIFICATION_CODE_MAX).contains(&n));
        }
    }

    #[test]
    fn default_pricing_is_three_dollars() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.paid_account_price.cents(), 300);
        assert_eq!(pricing.bounds, AmountBounds::default());
    }
}
