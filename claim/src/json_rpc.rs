//! [ChainGateway] over a wallet or node's JSON-RPC endpoint.

use std::time::Duration;

use alloy::{
    network::{Ethereum, TransactionBuilder},
    providers::{Provider, RootProvider},
    rpc::types::{BlockId, BlockNumberOrTag, Filter, Log as RpcLog, TransactionRequest},
    transports::{
        http::{Client, Http},
        RpcError, TransportError,
    },
};
use alloy_primitives::{Address, Bytes, U256};
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, warn};

use crate::{
    contracts::IERC20,
    gateway::{
        self, ChainGateway, ContractCall, EventFilter, GatewayError, Log, PendingTransaction,
        PermitRequest, Receipt, Result, Signature,
    },
};

impl From<TransportError> for GatewayError {
    fn from(error: TransportError) -> Self {
        match error {
            RpcError::ErrorResp(payload) => GatewayError::Rpc {
                code: payload.code,
                message: payload.message.to_string(),
                data: payload.data.map(|data| {
                    // string payloads carry the revert text, anything else stays raw
                    serde_json::from_str::<String>(data.get())
                        .unwrap_or_else(|_| data.get().to_string())
                }),
            },
            RpcError::DeserError { err, .. } => GatewayError::Decode(err.to_string()),
            other => GatewayError::Transport(other.to_string()),
        }
    }
}

fn to_log(log: &RpcLog) -> Log {
    Log {
        address: log.address(),
        topics: log.topics().to_vec(),
        data: log.data().data.clone(),
        block_number: log.block_number,
        transaction_hash: log.transaction_hash,
    }
}

pub struct JsonRpcGateway {
    provider: RootProvider<Http<Client>, Ethereum>,
    /// Account to act as when the endpoint manages several
    account: Option<Address>,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl JsonRpcGateway {
    pub fn new(url: &str) -> Result<Self> {
        let rpc_url = url
            .parse()
            .map_err(|e| GatewayError::Transport(format!("invalid rpc url {url}: {e}")))?;
        Ok(Self {
            provider: RootProvider::new_http(rpc_url),
            account: None,
            poll_interval: Duration::from_secs(2),
            confirmation_timeout: Duration::from_secs(600),
        })
    }

    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_polling(mut self, poll_interval: Duration, confirmation_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.confirmation_timeout = confirmation_timeout;
        self
    }

    /// Replays a reverted transaction at its block to get the revert message.
    async fn revert_reason(&self, pending: &PendingTransaction, block: BlockId) -> Option<String> {
        let tx = transaction_request(Some(pending.from), &pending.call, None);
        match self.provider.call(&tx).block(block).await.map_err(GatewayError::from) {
            Err(GatewayError::Rpc { message, data, .. }) => Some(match data {
                Some(data) if !data.starts_with("0x") => format!("{message}: {data}"),
                _ => message,
            }),
            _ => None,
        }
    }
}

fn transaction_request(from: Option<Address>, call: &ContractCall, gas: Option<u64>) -> TransactionRequest {
    let mut tx = TransactionRequest::default()
        .with_to(call.to)
        .with_input(call.data.clone());
    if let Some(from) = from {
        tx = tx.with_from(from);
    }
    if !call.value.is_zero() {
        tx = tx.with_value(call.value);
    }
    if let Some(gas) = gas {
        tx = tx.with_gas_limit(gas);
    }
    tx
}

fn log_filter(filter: &EventFilter) -> Filter {
    let mut query = Filter::new()
        .address(filter.address)
        .from_block(filter.from_block)
        .to_block(BlockNumberOrTag::Latest);
    for (slot, topic) in query.topics.iter_mut().zip(filter.topics) {
        if let Some(topic) = topic {
            *slot = topic.into();
        }
    }
    query
}

impl ChainGateway for JsonRpcGateway {
    async fn account(&self) -> Result<Address> {
        let accounts = self.provider.get_accounts().await?;
        match self.account {
            Some(account) if accounts.contains(&account) => Ok(account),
            Some(_) => Err(GatewayError::NoAccount),
            None => accounts.first().copied().ok_or(GatewayError::NoAccount),
        }
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes> {
        let tx = transaction_request(None, call, None);
        Ok(self.provider.call(&tx).block(BlockId::latest()).await?)
    }

    async fn estimate_gas(&self, from: Address, call: &ContractCall) -> Result<u64> {
        let tx = transaction_request(Some(from), call, None);
        Ok(self.provider.estimate_gas(&tx).await?)
    }

    #[instrument(skip(self, call), fields(label = %call.label))]
    async fn send_transaction(
        &self,
        from: Address,
        call: &ContractCall,
        gas_limit: u64,
    ) -> Result<PendingTransaction> {
        let tx = transaction_request(Some(from), call, Some(gas_limit));
        let pending = self.provider.send_transaction(tx).await?;
        debug!("wallet accepted {}", pending.tx_hash());
        Ok(PendingTransaction {
            hash: *pending.tx_hash(),
            from,
            call: call.clone(),
            gas_limit,
        })
    }

    #[instrument(skip(self, pending), fields(hash = %pending.hash))]
    async fn await_confirmation(&self, pending: &PendingTransaction) -> Result<Receipt> {
        let started = Instant::now();
        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(pending.hash).await? {
                let block_number = receipt
                    .block_number
                    .ok_or_else(|| GatewayError::Decode(format!("{} mined without a block", pending.hash)))?;
                if !receipt.status() {
                    let reason = self.revert_reason(pending, BlockId::number(block_number)).await;
                    warn!("{} reverted: {reason:?}", pending.hash);
                    return Err(GatewayError::Reverted {
                        transaction_hash: pending.hash,
                        reason,
                    });
                }
                return Ok(Receipt {
                    transaction_hash: receipt.transaction_hash,
                    block_number,
                    gas_used: receipt.gas_used as u64,
                    logs: receipt.inner.logs().iter().map(to_log).collect(),
                });
            }
            if started.elapsed() >= self.confirmation_timeout {
                return Err(GatewayError::ConfirmationTimeout(pending.hash));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn query_events(&self, filter: &EventFilter) -> Result<Vec<Log>> {
        let logs = self.provider.get_logs(&log_filter(filter)).await?;
        Ok(logs.iter().map(to_log).collect())
    }

    async fn sign_permit(&self, permit: &PermitRequest) -> Result<Signature> {
        let name = gateway::read(self, permit.token, IERC20::nameCall {})
            .await?
            .value;
        let nonce = gateway::read(self, permit.token, IERC20::noncesCall { owner: permit.owner })
            .await?
            .nonce;
        let chain_id = self.chain_id().await?;
        let typed_data = permit_typed_data(permit, &name, nonce, chain_id);

        let signature: Bytes = self
            .provider
            .raw_request(
                "eth_signTypedData_v4".into(),
                (permit.owner, typed_data.to_string()),
            )
            .await?;
        Signature::from_rsv(&signature)
            .ok_or_else(|| GatewayError::Decode(format!("signature of {} bytes", signature.len())))
    }
}

/// EIP-712 payload for an ERC-2612 `Permit`.
pub fn permit_typed_data(permit: &PermitRequest, name: &str, nonce: U256, chain_id: u64) -> Value {
    json!({
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"},
            ],
            "Permit": [
                {"name": "owner", "type": "address"},
                {"name": "spender", "type": "address"},
                {"name": "value", "type": "uint256"},
                {"name": "nonce", "type": "uint256"},
                {"name": "deadline", "type": "uint256"},
            ],
        },
        "primaryType": "Permit",
        "domain": {
            "name": name,
            "version": "1",
            "chainId": chain_id,
            "verifyingContract": permit.token,
        },
        "message": {
            "owner": permit.owner,
            "spender": permit.spender,
            "value": permit.value.to_string(),
            "nonce": nonce.to_string(),
            "deadline": permit.deadline.to_string(),
        },
    })
}
