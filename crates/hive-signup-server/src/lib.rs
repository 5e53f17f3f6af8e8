pub mod config;
pub mod cors;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod security;
pub mod state;

pub use config::SignupConfig;
pub use error::ApiError;
pub use state::{AppState, Backend, Live};
