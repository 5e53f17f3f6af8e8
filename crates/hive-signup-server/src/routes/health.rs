use actix_web::{web, HttpRequest, HttpResponse};

use crate::metrics::REGISTRY;
use crate::security::has_bearer;
use crate::state::{AppState, Backend};

/// GET /health - Health check endpoint
///
/// A missing price is reported but does not fail the check: paid signups
/// still work at the minimum quote.
pub async fn health<B: Backend>(state: web::Data<AppState<B>>) -> HttpResponse {
    let snapshot = state.prices.snapshot();
    let price_status = if !snapshot.is_known() {
        "unknown"
    } else if state.prices.is_stale() {
        "stale"
    } else {
        "fresh"
    };

    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "hive-signup-server",
        "version": env!("CARGO_PKG_VERSION"),
        "price": {
            "status": price_status,
            "usd": snapshot.usd,
            "lastUpdated": snapshot.last_updated,
        },
    }))
}

/// GET /metrics - Prometheus metrics endpoint (optionally auth-gated)
pub async fn metrics<B: Backend>(req: HttpRequest, state: web::Data<AppState<B>>) -> HttpResponse {
    if let Some(ref expected_token) = state.config.metrics_token {
        if !has_bearer(&req, expected_token) {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "Valid Bearer token required for /metrics"
            }));
        }
    }

    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return HttpResponse::InternalServerError().body("Failed to encode metrics");
    }

    let output = String::from_utf8(buffer).unwrap_or_default();
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(output)
}

pub fn configure<B: Backend>(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::<B>))
        .route("/metrics", web::get().to(metrics::<B>));
}
