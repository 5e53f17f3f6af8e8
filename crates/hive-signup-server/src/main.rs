use std::sync::Arc;

use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hive_signup::{Ledger, SqliteLedger};
use hive_signup_server::{
    config::SignupConfig, cors::build_cors, metrics::register_metrics, routes, AppState, Live,
};

/// How many unfulfilled paid signups to report at startup.
const STARTUP_UNFULFILLED_SCAN: u32 = 100;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match SignupConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;

    tracing::info!("Starting hive-signup-server on port {}", port);
    tracing::info!("Paid account price: {} USD", config.paid_account_price);
    tracing::info!(
        "HIVE bounds: {} - {}",
        config.bounds.min().to_asset_string(),
        config.bounds.max().to_asset_string()
    );
    tracing::info!("Receiving account: {}", config.receiving_account);

    // Initialize ledger
    let ledger = match SqliteLedger::open(&config.db_path) {
        Ok(ledger) => ledger,
        Err(e) => {
            tracing::error!(error = %e, path = %config.db_path, "failed to open ledger");
            std::process::exit(1);
        }
    };
    tracing::info!("Ledger initialized at: {}", config.db_path);

    // Paid signups left without an account by a previous run need an operator.
    match ledger.list_unfulfilled(STARTUP_UNFULFILLED_SCAN) {
        Ok(rows) if rows.is_empty() => {}
        Ok(rows) => tracing::warn!(
            count = rows.len(),
            "paid signups awaiting account creation, see /api/admin/unfulfilled"
        ),
        Err(e) => tracing::warn!(error = %e, "failed to scan for unfulfilled signups"),
    }

    // Register Prometheus metrics
    if let Err(e) = register_metrics() {
        tracing::error!(error = %e, "failed to register metrics");
    }

    let state = match AppState::<Live>::live(config, Arc::new(ledger)) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to build application state");
            std::process::exit(1);
        }
    };

    // Warm the price cache, then keep it fresh in the background.
    if state.prices.refresh().await.is_err() {
        tracing::warn!("starting without a HIVE price, paid quotes use the minimum bound");
    }
    let refresh_task = state.prices.spawn_refresh_task();

    let state_data = web::Data::new(state);

    // Configure rate limiter
    let Some(governor_conf) = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm as u64)
        .finish()
    else {
        tracing::error!(rate_limit_rpm, "invalid rate limiter configuration");
        std::process::exit(1);
    };

    let result = HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .app_data(routes::json_config())
            .wrap(Logger::default())
            .wrap(build_cors(&allowed_origins))
            .wrap(Governor::new(&governor_conf))
            .configure(routes::configure::<Live>)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await;

    refresh_task.abort();
    result
}
