use actix_web::{web, HttpResponse};
use hive_signup::{CreationOutcome, IgnoreReason, PaymentEvent, Reconciliation, SignupError};

use crate::error::ApiError;
use crate::metrics::{ACCOUNT_CREATION_FAILURES, PAYMENT_EVENTS};
use crate::state::{AppState, Backend};

/// POST /api/check-payment - Payment webhook
///
/// 404 only when the memo matches no signup. Replays, underpayments and
/// other ignored events are acknowledged with 200 so the sender stops
/// retrying.
pub async fn check_payment<B: Backend>(
    state: web::Data<AppState<B>>,
    body: web::Json<PaymentEvent>,
) -> Result<HttpResponse, ApiError> {
    let event = body.into_inner();

    let result = match state.reconciler.reconcile(&event).await {
        Ok(result) => result,
        Err(e) => {
            PAYMENT_EVENTS.with_label_values(&["error"]).inc();
            return Err(e.into());
        }
    };
    PAYMENT_EVENTS.with_label_values(&[result.as_str()]).inc();

    match result {
        Reconciliation::Ignored(IgnoreReason::UnknownReference) => Err(ApiError::Signup(
            SignupError::NotFound("Invalid transaction".to_string()),
        )),
        Reconciliation::Ignored(reason) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "success",
            "result": reason.as_str(),
        }))),
        Reconciliation::Accepted { account, creation } => {
            if let CreationOutcome::Failed(_) = creation {
                ACCOUNT_CREATION_FAILURES.inc();
            }
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "status": "success",
                "result": "accepted",
                "referenceId": account.reference_id,
                "creationStatus": creation.status(),
            })))
        }
    }
}

pub fn configure<B: Backend>(cfg: &mut web::ServiceConfig) {
    cfg.route("/check-payment", web::post().to(check_payment::<B>));
}
