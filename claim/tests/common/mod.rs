#![allow(dead_code)]

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use alloy_primitives::{address, keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use levx_claim::{
    auth::{Authenticator, LoginMethod},
    config::{Deployment, Deployments, LEVX, WETH},
    controller::{ClaimController, TxPhase},
    error::{ClaimError, Result},
    gateway::{
        self, ChainGateway, ContractCall, EventFilter, GatewayError, Log, PendingTransaction,
        PermitRequest, Receipt, Signature,
    },
};
use levx_merkle_tree::{
    airdrop_merkle_tree::AirdropMerkleTree, campaign::Campaign, tree_node::TreeNode,
    utils::parse_amount,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

pub const ALICE: Address = address!("5B38Da6a701c568545dCfcB03FcB875f56beddC4");
pub const BOB: Address = address!("Ab8483F64d9C6d1EcF9b849Ae677dD3315835cb2");
pub const CAROL: Address = address!("4B20993Bc481177ec7E8f571ceCaE8A9e22C02db");
pub const MALLORY: Address = address!("CA35b7d915458EF540aDe6068dFe2F44E8fa733c");

pub const NOW: u64 = 1_700_000_000;

pub fn fixed_clock() -> u64 {
    NOW
}

type Effect = Box<dyn FnOnce(&mut MockState) + Send>;

/// Scripted chain: reads are answered from stubs, sends are recorded and
/// `on_confirm` effects run when a transaction is mined.
#[derive(Default)]
pub struct MockState {
    pub account: Option<Address>,
    pub chain_id: u64,
    pub reads: HashMap<(Address, Bytes), Bytes>,
    pub gas_estimate: u64,
    pub estimate_error: Option<GatewayError>,
    pub send_error: Option<GatewayError>,
    pub revert_reason: Option<String>,
    pub estimated: Vec<ContractCall>,
    pub sent: Vec<PendingTransaction>,
    pub logs: Vec<Log>,
    pub on_confirm: Vec<Effect>,
    pub permits: Vec<PermitRequest>,
    pub read_count: usize,
    pub block_number: u64,
}

impl MockState {
    /// Answer `call` on `to` with raw return data.
    pub fn stub<C: SolCall>(&mut self, to: Address, call: C, returns: Vec<u8>) {
        self.reads
            .insert((to, Bytes::from(call.abi_encode())), returns.into());
    }
}

pub struct MockGateway {
    pub state: Mutex<MockState>,
    confirmation_gate: Mutex<Option<Arc<Notify>>>,
    query_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockGateway {
    pub fn new(account: Address) -> Self {
        Self {
            state: Mutex::new(MockState {
                account: Some(account),
                chain_id: 1,
                gas_estimate: 100_000,
                block_number: 12_000_000,
                ..Default::default()
            }),
            confirmation_gate: Mutex::new(None),
            query_gate: Mutex::new(None),
        }
    }

    pub fn set_account(&self, account: Address) {
        self.state.lock().account = Some(account);
    }

    pub fn set_gas_estimate(&self, estimate: u64) {
        self.state.lock().gas_estimate = estimate;
    }

    pub fn fail_next_send(&self, error: GatewayError) {
        self.state.lock().send_error = Some(error);
    }

    pub fn revert_next(&self, reason: &str) {
        self.state.lock().revert_reason = Some(reason.to_string());
    }

    /// Answer `call` on `to` with raw return data.
    pub fn stub<C: SolCall>(&self, to: Address, call: C, returns: Vec<u8>) {
        self.state.lock().stub(to, call, returns);
    }

    pub fn add_log(&self, log: Log) {
        self.state.lock().logs.push(log);
    }

    pub fn on_confirm(&self, effect: impl FnOnce(&mut MockState) + Send + 'static) {
        self.state.lock().on_confirm.push(Box::new(effect));
    }

    /// The next confirmation waits until `gate` is notified.
    pub fn hold_next_confirmation(&self, gate: Arc<Notify>) {
        *self.confirmation_gate.lock() = Some(gate);
    }

    /// The next event query waits until `gate` is notified.
    pub fn hold_next_query(&self, gate: Arc<Notify>) {
        *self.query_gate.lock() = Some(gate);
    }

    pub fn sent(&self) -> Vec<PendingTransaction> {
        self.state.lock().sent.clone()
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().read_count
    }
}

impl ChainGateway for MockGateway {
    async fn account(&self) -> gateway::Result<Address> {
        self.state.lock().account.ok_or(GatewayError::NoAccount)
    }

    async fn chain_id(&self) -> gateway::Result<u64> {
        Ok(self.state.lock().chain_id)
    }

    async fn call(&self, call: &ContractCall) -> gateway::Result<Bytes> {
        let mut state = self.state.lock();
        state.read_count += 1;
        state
            .reads
            .get(&(call.to, call.data.clone()))
            .cloned()
            .ok_or_else(|| GatewayError::Rpc {
                code: -32000,
                message: format!("execution reverted: no stub for {}", call.label),
                data: None,
            })
    }

    async fn estimate_gas(&self, _from: Address, call: &ContractCall) -> gateway::Result<u64> {
        let mut state = self.state.lock();
        state.estimated.push(call.clone());
        match state.estimate_error.clone() {
            Some(error) => Err(error),
            None => Ok(state.gas_estimate),
        }
    }

    async fn send_transaction(
        &self,
        from: Address,
        call: &ContractCall,
        gas_limit: u64,
    ) -> gateway::Result<PendingTransaction> {
        let mut state = self.state.lock();
        if let Some(error) = state.send_error.take() {
            return Err(error);
        }
        let pending = PendingTransaction {
            hash: keccak256((state.sent.len() as u64).to_be_bytes()),
            from,
            call: call.clone(),
            gas_limit,
        };
        state.sent.push(pending.clone());
        Ok(pending)
    }

    async fn await_confirmation(&self, pending: &PendingTransaction) -> gateway::Result<Receipt> {
        let gate = self.confirmation_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut state = self.state.lock();
        state.block_number += 1;
        if let Some(reason) = state.revert_reason.take() {
            return Err(GatewayError::Reverted {
                transaction_hash: pending.hash,
                reason: Some(reason),
            });
        }
        let effects = std::mem::take(&mut state.on_confirm);
        for effect in effects {
            effect(&mut state);
        }
        Ok(Receipt {
            transaction_hash: pending.hash,
            block_number: state.block_number,
            gas_used: pending.gas_limit / 2,
            logs: vec![],
        })
    }

    async fn query_events(&self, filter: &EventFilter) -> gateway::Result<Vec<Log>> {
        let gate = self.query_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let state = self.state.lock();
        Ok(state
            .logs
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }

    async fn sign_permit(&self, permit: &PermitRequest) -> gateway::Result<Signature> {
        self.state.lock().permits.push(permit.clone());
        Ok(Signature {
            v: 27,
            r: B256::repeat_byte(0xaa),
            s: B256::repeat_byte(0xbb),
        })
    }
}

/// Identity provider with a fixed token, `None` when logged out.
pub struct StaticAuthenticator {
    pub token: Mutex<Option<String>>,
}

impl StaticAuthenticator {
    pub fn logged_in(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }

    pub fn logged_out() -> Self {
        Self {
            token: Mutex::new(None),
        }
    }
}

impl Authenticator for StaticAuthenticator {
    async fn login(&self, method: LoginMethod, redirect_uri: &str) -> Result<String> {
        Ok(format!(
            "https://levx.eu.auth0.com/authorize?connection={}&redirect_uri={redirect_uri}",
            method.connection()
        ))
    }

    async fn logout(&self, _return_to: &str) -> Result<()> {
        *self.token.lock() = None;
        Ok(())
    }

    async fn access_token(&self, _scopes: &str) -> Result<String> {
        self.token.lock().clone().ok_or(ClaimError::NotAuthenticated)
    }
}

pub fn word(value: U256) -> Vec<u8> {
    value.to_be_bytes::<32>().to_vec()
}

pub fn words(values: &[U256]) -> Vec<u8> {
    values.iter().flat_map(|v| word(*v)).collect()
}

pub fn address_word(address: Address) -> Vec<u8> {
    address.into_word().to_vec()
}

/// Return data of a function returning a single `string`.
pub fn string_return(value: &str) -> Vec<u8> {
    let mut out = word(U256::from(32));
    out.extend(word(U256::from(value.len())));
    let mut bytes = value.as_bytes().to_vec();
    bytes.resize(value.len().div_ceil(32) * 32, 0);
    out.extend(bytes);
    out
}

pub fn ether(value: &str) -> U256 {
    parse_amount(value).unwrap()
}

pub fn deployments() -> Deployments {
    Deployments {
        eth_airdrop: Deployment::new(address!("1000000000000000000000000000000000000001"), 11_000_000),
        levx_airdrop: Deployment::new(address!("1000000000000000000000000000000000000002"), 11_000_000),
        zero_money: Deployment::new(address!("1000000000000000000000000000000000000003"), 11_500_000),
        levx_payout: Deployment::new(address!("1000000000000000000000000000000000000004"), 11_600_000),
        levx_distribution: Deployment::new(address!("1000000000000000000000000000000000000005"), 11_700_000),
        swapper: Deployment::new(address!("1000000000000000000000000000000000000006"), 0),
        migratoooooor: Deployment::new(address!("1000000000000000000000000000000000000007"), 0),
        levx_weth_pair: address!("1000000000000000000000000000000000000008"),
        migrate_lp_token: address!("1000000000000000000000000000000000000009"),
        migrate_token: address!("100000000000000000000000000000000000000a"),
        weth: WETH,
    }
}

/// Alice 10.0, Bob 2.5, Carol 1e-18, paid in ether when `token` is zero.
pub fn campaign(token: Address) -> Campaign {
    let tree = AirdropMerkleTree::new(vec![
        TreeNode::new(ALICE, ether("10.0")),
        TreeNode::new(BOB, ether("2.5")),
        TreeNode::new(CAROL, ether("0.000000000000000001")),
    ])
    .unwrap();
    Campaign::from_tree(
        if token == LEVX { "LEVX Airdrop" } else { "ETH Airdrop" }.to_string(),
        "test campaign".to_string(),
        token,
        Some(11_000_000),
        &tree,
    )
}

pub async fn wait_for_phase<G: ChainGateway, F: levx_claim::flows::ClaimFlow>(
    controller: &ClaimController<G, F>,
    phase: TxPhase,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while controller.phase() != phase {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("phase never reached");
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition never met");
}

/// Serves `router` on an ephemeral local port.
pub async fn serve(router: axum::Router) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(router.into_make_service());
    tokio::spawn(server);
    addr
}

/// An address nothing listens on.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}
