//! Process-wide wallet connection.
//!
//! One [WalletSession] is created at start-up and shared by every controller.
//! Each change of account or network bumps the epoch; controllers capture the
//! [Identity] before an async step and drop the result if it is no longer
//! current when the step completes.

use alloy_primitives::Address;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use crate::{
    error::{ClaimError, Result},
    gateway::ChainGateway,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub account: Address,
    pub chain_id: u64,
    pub epoch: u64,
}

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    epoch: u64,
}

pub struct WalletSession<G> {
    gateway: G,
    state: RwLock<SessionState>,
    changes: broadcast::Sender<Option<Identity>>,
}

impl<G: ChainGateway> WalletSession<G> {
    pub fn new(gateway: G) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            gateway,
            state: RwLock::new(SessionState::default()),
            changes,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Reads the wallet's account and network. Called on start-up and whenever
    /// the wallet reports a change; the epoch moves only when something did.
    pub async fn connect(&self) -> Result<Identity> {
        let account = self.gateway.account().await?;
        let chain_id = self.gateway.chain_id().await?;

        let mut state = self.state.write();
        if let Some(identity) = state.identity {
            if identity.account == account && identity.chain_id == chain_id {
                return Ok(identity);
            }
        }
        state.epoch += 1;
        let identity = Identity {
            account,
            chain_id,
            epoch: state.epoch,
        };
        state.identity = Some(identity);
        drop(state);

        info!("connected {account} on chain {chain_id} (epoch {})", identity.epoch);
        let _ = self.changes.send(Some(identity));
        Ok(identity)
    }

    pub fn disconnect(&self) {
        let mut state = self.state.write();
        if state.identity.take().is_none() {
            return;
        }
        state.epoch += 1;
        drop(state);

        info!("wallet disconnected");
        let _ = self.changes.send(None);
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.read().identity
    }

    pub fn require_identity(&self) -> Result<Identity> {
        self.identity().ok_or(ClaimError::NotConnected)
    }

    pub fn is_current(&self, identity: &Identity) -> bool {
        self.state.read().identity.as_ref() == Some(identity)
    }

    /// Every identity change, `None` on disconnect.
    pub fn subscribe(&self) -> broadcast::Receiver<Option<Identity>> {
        self.changes.subscribe()
    }
}
