//! Username validation against Hive account-name rules and on-chain availability.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::constants::DEFAULT_HIVE_API_NODES;
use crate::error::SignupError;

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 16;
const NODE_TIMEOUT: Duration = Duration::from_secs(10);

/// External check that a requested username can be registered.
pub trait NameService: Send + Sync {
    /// `Ok(())` when `username` is well-formed and unclaimed on the network.
    ///
    /// Fails with `InvalidUsername` when rejected and `UpstreamUnavailable`
    /// when availability could not be determined.
    fn validate(&self, username: &str)
        -> impl std::future::Future<Output = Result<(), SignupError>> + Send;
}

/// Hive account-name format rules.
///
/// 3 to 16 characters in dot-separated labels. Each label is at least 3
/// characters, starts with a lowercase letter, contains only `[a-z0-9-]`,
/// ends with a letter or digit and never contains `--`.
pub fn validate_hive_username(name: &str) -> Result<(), SignupError> {
    let invalid = |why: &str| Err(SignupError::InvalidUsername(format!("'{name}' {why}")));

    if name.len() < MIN_NAME_LEN {
        return invalid("is too short");
    }
    if name.len() > MAX_NAME_LEN {
        return invalid("is too long");
    }

    for label in name.split('.') {
        if label.len() < MIN_NAME_LEN {
            return invalid("has a segment shorter than 3 characters");
        }
        if !label.starts_with(|c: char| c.is_ascii_lowercase()) {
            return invalid("segments must start with a lowercase letter");
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return invalid("may only contain lowercase letters, digits, dashes and dots");
        }
        if !label.ends_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return invalid("segments must end with a letter or digit");
        }
        if label.contains("--") {
            return invalid("may not contain consecutive dashes");
        }
    }

    Ok(())
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// `true` when a `condenser_api.get_accounts` response says the name is free.
fn parse_get_accounts(body: RpcResponse) -> Result<bool, SignupError> {
    if let Some(err) = body.error {
        return Err(SignupError::UpstreamUnavailable(format!("rpc error: {err}")));
    }
    match body.result {
        Some(accounts) => Ok(accounts.is_empty()),
        None => Err(SignupError::UpstreamUnavailable(
            "rpc response has no result".to_string(),
        )),
    }
}

/// Validates names locally, then asks Hive API nodes whether the account
/// exists, failing over to the next node on any upstream error.
#[derive(Clone)]
pub struct HiveNameService {
    client: reqwest::Client,
    nodes: Vec<String>,
}

impl HiveNameService {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_nodes(
            client,
            DEFAULT_HIVE_API_NODES.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_nodes(client: reqwest::Client, nodes: Vec<String>) -> Self {
        Self { client, nodes }
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    async fn query_node(&self, node: &str, username: &str) -> Result<bool, SignupError> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": "condenser_api.get_accounts",
            "params": [[username]],
            "id": 1,
        });

        let resp = self
            .client
            .post(node)
            .json(&request)
            .timeout(NODE_TIMEOUT)
            .send()
            .await
            .map_err(|e| SignupError::UpstreamUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SignupError::UpstreamUnavailable(format!(
                "node returned {}",
                resp.status()
            )));
        }

        let body: RpcResponse = resp
            .json()
            .await
            .map_err(|e| SignupError::UpstreamUnavailable(format!("bad rpc body: {e}")))?;
        parse_get_accounts(body)
    }

    /// Whether `username` is unclaimed, trying each node in order.
    pub async fn is_available(&self, username: &str) -> Result<bool, SignupError> {
        for node in &self.nodes {
            match self.query_node(node, username).await {
                Ok(available) => return Ok(available),
                Err(e) => {
                    tracing::warn!(node = %node, error = %e, "Hive API node failed, trying next");
                }
            }
        }
        Err(SignupError::UpstreamUnavailable(
            "all Hive API nodes failed".to_string(),
        ))
    }
}

impl NameService for HiveNameService {
    async fn validate(&self, username: &str) -> Result<(), SignupError> {
        validate_hive_username(username)?;
        if self.is_available(username).await? {
            Ok(())
        } else {
            Err(SignupError::InvalidUsername(format!(
                "'{username}' is already taken"
            )))
        }
    }
}
