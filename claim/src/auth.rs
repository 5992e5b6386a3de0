//! Redirect based login against the identity provider.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ClaimError, Result};

/// Scopes requested with every access token.
pub const ACCESS_TOKEN_SCOPES: &str = "openid profile email";

/// Query parameters the identity provider appends to the redirect, valid once.
const ONE_TIME_PARAMS: [&str; 2] = ["code", "state"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    Twitter,
    Discord,
}

impl LoginMethod {
    /// Connection name passed to the identity provider
    pub fn connection(&self) -> &'static str {
        match self {
            LoginMethod::Twitter => "twitter",
            LoginMethod::Discord => "discord",
        }
    }
}

/// Identity provider capability.
#[allow(async_fn_in_trait)]
pub trait Authenticator {
    /// URL to send the user to. The provider returns to `redirect_uri`.
    async fn login(&self, method: LoginMethod, redirect_uri: &str) -> Result<String>;

    async fn logout(&self, return_to: &str) -> Result<()>;

    /// Short-lived token for `scopes`. Fails with [ClaimError::NotAuthenticated]
    /// when there is no session.
    async fn access_token(&self, scopes: &str) -> Result<String>;
}

#[derive(Debug, Default)]
struct AuthState {
    authenticated: bool,
    epoch: u64,
}

/// Process-wide authenticated session, shared by the grant flows.
pub struct AuthSession<A> {
    authenticator: A,
    state: Mutex<AuthState>,
}

impl<A: Authenticator> AuthSession<A> {
    pub fn new(authenticator: A) -> Self {
        Self {
            authenticator,
            state: Mutex::new(AuthState::default()),
        }
    }

    pub async fn login(&self, method: LoginMethod, redirect_uri: &str) -> Result<String> {
        info!("login via {}", method.connection());
        self.authenticator.login(method, redirect_uri).await
    }

    /// Completes a login after the provider redirected back to `location`.
    /// Returns the location with the one-time parameters removed.
    pub async fn handle_redirect(&self, location: &str) -> Result<String> {
        self.access_token().await?;
        Ok(strip_one_time_params(location))
    }

    pub async fn logout(&self, return_to: &str) -> Result<()> {
        self.authenticator.logout(return_to).await?;
        let mut state = self.state.lock();
        state.authenticated = false;
        state.epoch += 1;
        Ok(())
    }

    pub async fn access_token(&self) -> Result<String> {
        let result = self.authenticator.access_token(ACCESS_TOKEN_SCOPES).await;
        let mut state = self.state.lock();
        match &result {
            Ok(_) if !state.authenticated => {
                state.authenticated = true;
                state.epoch += 1;
            }
            Err(ClaimError::NotAuthenticated) if state.authenticated => {
                debug!("session expired");
                state.authenticated = false;
                state.epoch += 1;
            }
            _ => {}
        }
        result
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().authenticated
    }

    /// Bumped on every login and logout.
    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }
}

/// `protocol//host[:port]/#/route`, the port left out when it is 80.
pub fn redirect_uri(protocol: &str, hostname: &str, port: Option<u16>, route: &str) -> String {
    let port = match port {
        None | Some(80) => String::new(),
        Some(port) => format!(":{port}"),
    };
    format!(
        "{protocol}//{hostname}{port}/#/{}",
        route.trim_start_matches('/')
    )
}

/// Drops `code` and `state` from the query of `location`, keeping everything else.
pub fn strip_one_time_params(location: &str) -> String {
    let (before_hash, hash) = match location.find('#') {
        Some(i) => location.split_at(i),
        None => (location, ""),
    };
    let Some((base, query)) = before_hash.split_once('?') else {
        return location.to_string();
    };
    let kept = query
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            !pair.is_empty() && !ONE_TIME_PARAMS.contains(&key)
        })
        .collect::<Vec<_>>();
    if kept.is_empty() {
        format!("{base}{hash}")
    } else {
        format!("{base}?{}{hash}", kept.join("&"))
    }
}
