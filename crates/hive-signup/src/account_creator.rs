//! Client for the downstream service that registers the account on chain.

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::account::ReferenceId;
use crate::constants::DEFAULT_ACCOUNT_CREATION_TIMEOUT;
use crate::error::SignupError;

/// Opaque external call that creates the on-chain account for a paid signup.
pub trait AccountCreator: Send + Sync {
    fn create_account(
        &self,
        reference_id: &ReferenceId,
        username: &str,
    ) -> impl std::future::Future<Output = Result<(), SignupError>> + Send;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountRequest<'a> {
    reference_id: &'a str,
    username: &'a str,
}

/// POSTs `{referenceId, username}` to the account-creation endpoint.
///
/// When a secret is configured the body is signed and the hex HMAC is sent
/// in `X-Signature`.
#[derive(Clone)]
pub struct HttpAccountCreator {
    client: reqwest::Client,
    url: String,
    secret: Option<Vec<u8>>,
    timeout: Duration,
}

impl HttpAccountCreator {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            secret: None,
            timeout: DEFAULT_ACCOUNT_CREATION_TIMEOUT,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Hex HMAC-SHA256 of the request body under the shared secret.
fn sign_body(secret: &[u8], body: &[u8]) -> Result<String, SignupError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|e| SignupError::Internal(format!("hmac key: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

impl AccountCreator for HttpAccountCreator {
    async fn create_account(
        &self,
        reference_id: &ReferenceId,
        username: &str,
    ) -> Result<(), SignupError> {
        let body = serde_json::to_vec(&CreateAccountRequest {
            reference_id: reference_id.as_str(),
            username,
        })?;

        let mut req = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .timeout(self.timeout);

        if let Some(secret) = &self.secret {
            req = req.header("X-Signature", sign_body(secret, &body)?);
        }

        let resp = req.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                SignupError::UpstreamUnavailable(format!(
                    "account creation timed out after {}s",
                    self.timeout.as_secs()
                ))
            } else {
                SignupError::UpstreamUnavailable(format!("account creation: {e}"))
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(SignupError::UpstreamUnavailable(format!(
                "account creation returned {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        tracing::debug!(reference_id = %reference_id, username, "account creation accepted");
        Ok(())
    }
}
