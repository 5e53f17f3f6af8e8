//! Hive account provisioning with free and paid signups.
//!
//! A signup is issued a reference id. Paid signups are quoted in HIVE from a
//! cached USD rate, clamped to safety bounds and frozen into the record. A
//! later payment whose memo carries the reference id settles the signup and
//! triggers on-chain account creation.
//!
//! # Components
//!
//! - [`PriceCache`]: last good HIVE/USD rate, refreshed in the background
//! - [`pricing::calculate`]: USD to bounded milli-HIVE quote
//! - [`Ledger`]: pending/paid records ([`SqliteLedger`], [`InMemoryLedger`])
//! - [`Provisioner`]: validates the name, prices and persists a signup
//! - [`Reconciler`]: matches payment events and hands off account creation
//!
//! # Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hive_signup::{
//!     AccountType, CoinGeckoFeed, HiveNameService, InMemoryLedger, PriceCache, PricingConfig,
//!     Provisioner, WidgetConfig, WidgetEnvironment,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), hive_signup::SignupError> {
//! let http = reqwest::Client::new();
//! let prices = Arc::new(PriceCache::new(CoinGeckoFeed::new(http.clone())));
//! let provisioner = Provisioner::new(
//!     Arc::new(InMemoryLedger::new()),
//!     prices,
//!     HiveNameService::new(http),
//!     PricingConfig::default(),
//!     WidgetConfig {
//!         api_key: None,
//!         environment: WidgetEnvironment::Staging,
//!         receiving_account: "signup.hive".to_string(),
//!         base_url: "http://localhost:3000".to_string(),
//!     },
//! );
//!
//! let signup = provisioner.init_account("alice", AccountType::Paid).await?;
//! println!("pay with memo {}", signup.reference_id());
//! # Ok(())
//! # }
//! ```

// Core types
pub mod account;
pub mod amount;
pub mod constants;
pub mod error;

// Pricing
pub mod price_cache;
pub mod price_feed;
pub mod pricing;

// Storage and workflow
pub mod ledger;
pub mod provisioning;
pub mod reconcile;

// Upstream collaborators
pub mod account_creator;
pub mod naming;
pub mod widget;

pub use account::{
    AccountStatus, AccountTerms, AccountType, CreationOutcome, CreationStatus, PaidTerms,
    PendingAccount, ReferenceId,
};
pub use account_creator::{AccountCreator, HttpAccountCreator};
pub use amount::{AssetAmount, HiveAmount, UsdAmount};
pub use error::SignupError;
pub use ledger::{InMemoryLedger, Ledger, SqliteLedger};
pub use naming::{HiveNameService, NameService};
pub use price_cache::{PriceCache, PriceSnapshot};
pub use price_feed::{CoinGeckoFeed, PriceFeed};
pub use pricing::{AmountBounds, Bound, Quote};
pub use provisioning::{InitAccount, PricingConfig, Provisioner};
pub use reconcile::{IgnoreReason, PaymentEvent, Reconciler, Reconciliation};
pub use widget::{PaymentInstructions, PricingBreakdown, WidgetConfig, WidgetEnvironment};
