use std::sync::Arc;

use hive_signup::{
    AccountCreator, CoinGeckoFeed, HiveNameService, HttpAccountCreator, Ledger, NameService,
    PriceCache, PriceFeed, Provisioner, Reconciler, SignupError,
};

use crate::config::SignupConfig;
use crate::metrics::MeteredFeed;

/// The upstream collaborators a running service is wired with.
pub trait Backend: 'static {
    type Feed: PriceFeed + 'static;
    type Names: NameService + 'static;
    type Creator: AccountCreator + 'static;
}

/// Production wiring: CoinGecko, Hive API nodes, HTTP account creator.
pub struct Live;

impl Backend for Live {
    type Feed = MeteredFeed<CoinGeckoFeed>;
    type Names = HiveNameService;
    type Creator = HttpAccountCreator;
}

/// Shared application state
pub struct AppState<B: Backend> {
    pub config: Arc<SignupConfig>,
    pub ledger: Arc<dyn Ledger>,
    pub prices: Arc<PriceCache<B::Feed>>,
    pub provisioner: Provisioner<B::Feed, B::Names>,
    pub reconciler: Reconciler<B::Creator>,
}

impl<B: Backend> AppState<B> {
    pub fn new(
        config: SignupConfig,
        ledger: Arc<dyn Ledger>,
        prices: Arc<PriceCache<B::Feed>>,
        names: B::Names,
        creator: B::Creator,
    ) -> Self {
        let provisioner = Provisioner::new(
            Arc::clone(&ledger),
            Arc::clone(&prices),
            names,
            config.pricing(),
            config.widget(),
        );
        let reconciler = Reconciler::new(Arc::clone(&ledger), creator)
            .with_creation_timeout(config.account_creator_timeout);
        Self {
            config: Arc::new(config),
            ledger,
            prices,
            provisioner,
            reconciler,
        }
    }
}

impl AppState<Live> {
    /// Wire the production collaborators from configuration.
    pub fn live(config: SignupConfig, ledger: Arc<dyn Ledger>) -> Result<Self, SignupError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let feed = MeteredFeed::new(CoinGeckoFeed::with_url(
            http_client.clone(),
            config.price_feed_url.clone(),
        ));
        let prices = Arc::new(PriceCache::with_interval(feed, config.price_update_interval));
        let names = HiveNameService::with_nodes(http_client.clone(), config.hive_api_nodes.clone());

        let mut creator = HttpAccountCreator::new(http_client, config.account_creator_url.clone())
            .with_timeout(config.account_creator_timeout);
        if let Some(secret) = &config.account_creator_secret {
            creator = creator.with_secret(secret.clone());
        }

        Ok(Self::new(config, ledger, prices, names, creator))
    }
}
