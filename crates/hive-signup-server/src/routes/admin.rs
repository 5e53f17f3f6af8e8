use actix_web::{web, HttpRequest, HttpResponse};
use hive_signup::{AccountStatus, CreationStatus, ReferenceId};
use serde::Deserialize;

use crate::error::ApiError;
use crate::metrics::ACCOUNT_CREATION_FAILURES;
use crate::security::has_bearer;
use crate::state::{AppState, Backend};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<AccountStatus>,
    pub limit: Option<u32>,
}

fn authorize<B: Backend>(req: &HttpRequest, state: &AppState<B>) -> Result<(), ApiError> {
    let Some(ref expected) = state.config.admin_token else {
        return Err(ApiError::Forbidden);
    };
    if has_bearer(req, expected) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// GET /api/admin/accounts?status=pending|paid&limit=N - Newest signups first
pub async fn list_accounts<B: Backend>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    authorize(&req, &state)?;
    let status = query.status.unwrap_or(AccountStatus::Pending);
    let accounts = state.ledger.list_by_status(status, clamp_limit(query.limit))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": status,
        "count": accounts.len(),
        "accounts": accounts,
    })))
}

/// GET /api/admin/unfulfilled?limit=N - Paid signups without a created account
pub async fn list_unfulfilled<B: Backend>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    authorize(&req, &state)?;
    let accounts = state.ledger.list_unfulfilled(clamp_limit(query.limit))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "count": accounts.len(),
        "accounts": accounts,
    })))
}

/// POST /api/admin/accounts/{referenceId}/retry-creation
pub async fn retry_creation<B: Backend>(
    req: HttpRequest,
    state: web::Data<AppState<B>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    authorize(&req, &state)?;
    let reference_id = ReferenceId::from(path.into_inner());

    let account = state.reconciler.retry_creation(&reference_id).await?;
    if account.creation_status == Some(CreationStatus::Failed) {
        ACCOUNT_CREATION_FAILURES.inc();
    }
    tracing::info!(
        reference_id = %reference_id,
        creation_status = account.creation_status.map(|s| s.as_str()),
        "operator retried account creation"
    );

    Ok(HttpResponse::Ok().json(account))
}

pub fn configure<B: Backend>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/accounts", web::get().to(list_accounts::<B>))
            .route("/unfulfilled", web::get().to(list_unfulfilled::<B>))
            .route(
                "/accounts/{reference_id}/retry-creation",
                web::post().to(retry_creation::<B>),
            ),
    );
}
