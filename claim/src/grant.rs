//! Client for the authorization service that signs claim grants.

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::gateway::Signature;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrantError {
    /// Non-200 answer, `message` is the service's first error verbatim
    #[error("authorization service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("authorization service unreachable: {0}")]
    Unreachable(String),

    #[error("invalid grant: {0}")]
    InvalidGrant(String),
}

/// Signed permission to claim, issued for one account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Grant {
    pub id: String,
    #[serde(default)]
    pub address: Option<String>,
    /// Amount in wei, absent for fixed-size grants
    #[serde(default)]
    pub amount: Option<String>,
    pub signature: Signature,
    /// Profile of the authenticated user, passed through untouched
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

impl Grant {
    pub fn id(&self) -> Result<U256, GrantError> {
        U256::from_str(&self.id).map_err(|e| GrantError::InvalidGrant(format!("id {}: {e}", self.id)))
    }

    pub fn amount(&self) -> Result<Option<U256>, GrantError> {
        self.amount
            .as_deref()
            .map(|amount| {
                U256::from_str(amount)
                    .map_err(|e| GrantError::InvalidGrant(format!("amount {amount}: {e}")))
            })
            .transpose()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GrantClient {
    http: reqwest::Client,
    base_url: String,
}

impl GrantClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `GET {base}{path}?access_token=..&address=..`
    #[instrument(skip(self, access_token))]
    pub async fn fetch(
        &self,
        path: &str,
        access_token: &str,
        address: Address,
    ) -> Result<Grant, GrantError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("access_token", access_token.to_string()),
                ("address", address.to_checksum(None)),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!("request to {url} failed: {e}");
                GrantError::Unreachable(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::OK {
            let grant = response
                .json::<Grant>()
                .await
                .map_err(|e| GrantError::Unreachable(e.to_string()))?;
            debug!("grant {} issued for {address}", grant.id);
            return Ok(grant);
        }

        let body = response
            .json::<ErrorBody>()
            .await
            .map_err(|e| GrantError::Unreachable(e.to_string()))?;
        let message = body
            .errors
            .into_iter()
            .next()
            .and_then(|e| e.message)
            .unwrap_or_default();
        Err(GrantError::Service {
            status: status.as_u16(),
            message,
        })
    }
}
