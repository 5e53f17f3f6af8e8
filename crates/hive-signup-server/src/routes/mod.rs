pub mod account;
pub mod admin;
pub mod health;
pub mod payment;
pub mod pricing;

use actix_web::web;

use crate::error::ApiError;
use crate::state::Backend;

/// JSON body limit for API requests.
pub const JSON_LIMIT: usize = 65_536;

/// JSON extractor config: 64 KiB limit, parse errors as `{error}` 400s.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

/// Mount every route: `/health`, `/metrics` and the `/api` scope.
pub fn configure<B: Backend>(cfg: &mut web::ServiceConfig) {
    health::configure::<B>(cfg);
    cfg.service(
        web::scope("/api")
            .configure(account::configure::<B>)
            .configure(payment::configure::<B>)
            .configure(pricing::configure::<B>)
            .configure(admin::configure::<B>),
    );
}
