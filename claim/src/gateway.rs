//! Capability interface to the connected wallet and chain.
//!
//! Everything the controllers know about the chain goes through [ChainGateway].
//! The wallet behind it signs; controllers never see keys.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// JSON-RPC style error returned by the wallet or node
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },

    #[error("transaction {transaction_hash} reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Reverted {
        transaction_hash: B256,
        reason: Option<String>,
    },

    #[error("no confirmation for {0} before timeout")]
    ConfirmationTimeout(B256),

    #[error("wallet has no connected account")]
    NoAccount,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// A call against a deployed contract, already ABI encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    /// Solidity signature, for logs
    pub label: String,
}

impl ContractCall {
    pub fn new<C: SolCall>(to: Address, call: &C) -> Self {
        Self {
            to,
            data: call.abi_encode().into(),
            value: U256::ZERO,
            label: C::SIGNATURE.to_string(),
        }
    }
}

/// A submitted transaction the wallet accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTransaction {
    pub hash: B256,
    pub from: Address,
    pub call: ContractCall,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}

/// Event query against one contract, `None` topics match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub address: Address,
    pub topics: [Option<B256>; 4],
    pub from_block: u64,
}

impl EventFilter {
    pub fn new<E: SolEvent>(address: Address, from_block: u64) -> Self {
        Self {
            address,
            topics: [Some(E::SIGNATURE_HASH), None, None, None],
            from_block,
        }
    }

    /// Pin the indexed argument at `position` (1-based, topic 0 is the signature).
    pub fn topic(mut self, position: usize, value: B256) -> Self {
        self.topics[position] = Some(value);
        self
    }

    pub fn matches(&self, log: &Log) -> bool {
        log.address == self.address
            && log.block_number.map_or(true, |b| b >= self.from_block)
            && self
                .topics
                .iter()
                .enumerate()
                .all(|(i, want)| want.map_or(true, |want| log.topics.get(i) == Some(&want)))
    }
}

/// Indexed address as it appears in a topic
pub fn address_topic(address: Address) -> B256 {
    address.into_word()
}

/// Indexed uint256 as it appears in a topic
pub fn uint_topic(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

/// ERC-2612 permit to be signed by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermitRequest {
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub deadline: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl Signature {
    /// Splits a 65 byte `r ‖ s ‖ v` signature
    pub fn from_rsv(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 65 {
            return None;
        }
        let v = match bytes[64] {
            v @ (0 | 1) => v + 27,
            v => v,
        };
        Some(Self {
            v,
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
        })
    }
}

/// What the controllers need from a connected wallet.
#[allow(async_fn_in_trait)]
pub trait ChainGateway {
    /// Currently selected account
    async fn account(&self) -> Result<Address>;

    async fn chain_id(&self) -> Result<u64>;

    /// Read-only call, returns raw return data
    async fn call(&self, call: &ContractCall) -> Result<Bytes>;

    async fn estimate_gas(&self, from: Address, call: &ContractCall) -> Result<u64>;

    /// Ask the wallet to sign and broadcast. A declined prompt surfaces as
    /// [GatewayError::Rpc] with code 4001.
    async fn send_transaction(
        &self,
        from: Address,
        call: &ContractCall,
        gas_limit: u64,
    ) -> Result<PendingTransaction>;

    /// Resolves once mined. A reverted transaction is [GatewayError::Reverted].
    async fn await_confirmation(&self, pending: &PendingTransaction) -> Result<Receipt>;

    async fn query_events(&self, filter: &EventFilter) -> Result<Vec<Log>>;

    async fn sign_permit(&self, permit: &PermitRequest) -> Result<Signature>;
}

/// Typed read of a view function.
pub async fn read<G: ChainGateway, C: SolCall>(
    gateway: &G,
    to: Address,
    call: C,
) -> Result<C::Return> {
    let data = gateway.call(&ContractCall::new(to, &call)).await?;
    C::abi_decode_returns(&data, true).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Typed event query.
pub async fn query<G: ChainGateway, E: SolEvent>(
    gateway: &G,
    filter: &EventFilter,
) -> Result<Vec<(E, Log)>> {
    gateway
        .query_events(filter)
        .await?
        .into_iter()
        .map(|log| Ok((decode_log::<E>(&log)?, log)))
        .collect()
}

pub fn decode_log<E: SolEvent>(log: &Log) -> Result<E> {
    E::decode_raw_log(log.topics.iter().copied(), &log.data, true)
        .map_err(|e| GatewayError::Decode(e.to_string()))
}
