use actix_web::{web, HttpResponse};

use crate::state::{AppState, Backend};

/// GET /api/pricing - Current paid-account quote, refreshing a stale rate first.
/// Read-only: clamped quotes are counted when a signup freezes them.
pub async fn pricing<B: Backend>(state: web::Data<AppState<B>>) -> HttpResponse {
    let (quote, snapshot) = state.provisioner.current_quote().await;

    HttpResponse::Ok().json(serde_json::json!({
        "usdPrice": state.provisioner.pricing().paid_account_price,
        "tokenPrice": snapshot.usd,
        "tokenAmount": quote.amount,
        "lastUpdated": snapshot.last_updated,
        "clamped": quote.clamped,
    }))
}

pub fn configure<B: Backend>(cfg: &mut web::ServiceConfig) {
    cfg.route("/pricing", web::get().to(pricing::<B>));
}
