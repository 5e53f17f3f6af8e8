use actix_web::{web, HttpResponse};
use hive_signup::AccountType;
use serde::Deserialize;

use crate::error::ApiError;
use crate::metrics::{QUOTES_CLAMPED, SIGNUPS_INITIATED};
use crate::state::{AppState, Backend};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitAccountRequest {
    pub username: Option<String>,
    pub account_type: Option<AccountType>,
}

/// POST /api/init-account - Start a free or paid signup
pub async fn init_account<B: Backend>(
    state: web::Data<AppState<B>>,
    body: web::Json<InitAccountRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let username = body
        .username
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Username is required".to_string()))?;
    let account_type = body
        .account_type
        .ok_or_else(|| ApiError::BadRequest("accountType must be 'free' or 'paid'".to_string()))?;

    let signup = state
        .provisioner
        .init_account(&username, account_type)
        .await?;

    SIGNUPS_INITIATED
        .with_label_values(&[account_type.as_str()])
        .inc();
    if let Some(bound) = signup.quote.and_then(|q| q.clamped) {
        QUOTES_CLAMPED.with_label_values(&[bound.as_str()]).inc();
    }

    Ok(HttpResponse::Ok().json(signup))
}

pub fn configure<B: Backend>(cfg: &mut web::ServiceConfig) {
    cfg.route("/init-account", web::post().to(init_account::<B>));
}
