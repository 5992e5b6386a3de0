use alloy_primitives::{Address, B256, U256};
use levx_merkle_tree::campaign::AssetKind;
use serde::Serialize;
use tracing::debug;

use crate::{
    config::{Deployment, Deployments},
    contracts::{IAirdropEvents, IETHAirdrop, ILevxAirdrop, IUniswapV2Pair},
    eligibility::{AllocationTable, ClaimRecord, Eligibility, EligibilityState, ProofMaterial},
    error::{ClaimError, Result},
    flows::{ClaimFlow, FlowContext},
    gateway::{self, address_topic, ChainGateway, ContractCall, EventFilter},
    policy::{amount_out, deduct},
};

/// How an airdrop allocation is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Settlement {
    /// Ether straight from the ether airdrop
    Native,
    /// LEVX from the LEVX airdrop
    Token,
    /// Ether allocation swapped to LEVX in the same call
    SwapToLevx,
}

impl Settlement {
    pub fn for_asset(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Native => Settlement::Native,
            AssetKind::Token => Settlement::Token,
        }
    }
}

/// Claim from a published allocation table with a Merkle proof.
pub struct AirdropFlow {
    table: AllocationTable,
    settlement: Settlement,
    contract: Deployment,
    levx_weth_pair: Address,
    weth: Address,
}

impl AirdropFlow {
    pub fn new(table: AllocationTable, deployments: &Deployments) -> Self {
        let settlement = Settlement::for_asset(table.asset_kind());
        let contract = match settlement {
            Settlement::Token => deployments.levx_airdrop,
            Settlement::Native | Settlement::SwapToLevx => deployments.eth_airdrop,
        };
        Self {
            table,
            settlement,
            contract,
            levx_weth_pair: deployments.levx_weth_pair,
            weth: deployments.weth,
        }
    }

    /// Take an ether allocation as LEVX instead.
    pub fn swap_to_levx(mut self) -> Result<Self> {
        if self.settlement != Settlement::Native {
            return Err(ClaimError::Config(format!(
                "{} does not pay out ether",
                self.table.campaign().name
            )));
        }
        self.settlement = Settlement::SwapToLevx;
        Ok(self)
    }

    pub fn settlement_kind(&self) -> Settlement {
        self.settlement
    }

    /// LEVX out for `amount` wei in, after the pool fee.
    pub async fn quote_levx<G: ChainGateway>(
        &self,
        ctx: &FlowContext<'_, G>,
        amount: U256,
    ) -> Result<U256> {
        let token0 = gateway::read(ctx.gateway, self.levx_weth_pair, IUniswapV2Pair::token0Call {})
            .await?
            .token;
        let reserves =
            gateway::read(ctx.gateway, self.levx_weth_pair, IUniswapV2Pair::getReservesCall {})
                .await?;
        let (reserve_weth, reserve_levx) = if token0 == self.weth {
            (reserves.reserve0, reserves.reserve1)
        } else {
            (reserves.reserve1, reserves.reserve0)
        };
        amount_out(amount, reserve_weth, reserve_levx, ctx.config.swap_fee)
            .ok_or_else(|| ClaimError::Gateway("WETH/LEVX pool has no liquidity".to_string()))
    }
}

fn merkle_parts(eligibility: &Eligibility) -> Result<(B256, Vec<B256>, U256)> {
    match (&eligibility.proof, eligibility.amount) {
        (ProofMaterial::Merkle { root, proof }, Some(amount)) => Ok((*root, proof.clone(), amount)),
        _ => Err(ClaimError::NotEligible),
    }
}

impl ClaimFlow for AirdropFlow {
    fn name(&self) -> String {
        self.table.campaign().name.clone()
    }

    async fn resolve<G: ChainGateway>(&self, ctx: &FlowContext<'_, G>) -> Result<EligibilityState> {
        Ok(match self.table.resolve(ctx.account)? {
            Some(eligibility) => EligibilityState::Eligible(eligibility),
            None => EligibilityState::NotEligible,
        })
    }

    async fn claim_record<G: ChainGateway>(
        &self,
        ctx: &FlowContext<'_, G>,
        _eligibility: &Eligibility,
    ) -> Result<Option<ClaimRecord>> {
        let filter =
            EventFilter::new::<IAirdropEvents::Claim>(self.contract.address, self.contract.block_number)
                .topic(1, self.table.merkle_root())
                .topic(2, address_topic(ctx.account));
        let events = gateway::query::<G, IAirdropEvents::Claim>(ctx.gateway, &filter).await?;
        Ok(events.into_iter().next().map(|(event, log)| {
            debug!("{} already claimed in {:?}", ctx.account, log.transaction_hash);
            ClaimRecord {
                transaction_hash: log.transaction_hash,
                block_number: log.block_number,
                amount: event.amount,
            }
        }))
    }

    async fn settlement<G: ChainGateway>(
        &self,
        ctx: &FlowContext<'_, G>,
        eligibility: &Eligibility,
    ) -> Result<ContractCall> {
        let (root, proof, amount) = merkle_parts(eligibility)?;
        let call = match self.settlement {
            Settlement::Native => ContractCall::new(
                self.contract.address,
                &IETHAirdrop::claimCall {
                    merkleRoot: root,
                    merkleProof: proof,
                    amount,
                    beneficiary: ctx.account,
                },
            ),
            Settlement::Token => ContractCall::new(
                self.contract.address,
                &ILevxAirdrop::claimCall {
                    merkleRoot: root,
                    merkleProof: proof,
                    amount,
                },
            ),
            Settlement::SwapToLevx => {
                let quoted = self.quote_levx(ctx, amount).await?;
                let amount_out_min = deduct(quoted, ctx.config.allowed_slippage);
                debug!("swap {amount} wei for at least {amount_out_min} LEVX");
                ContractCall::new(
                    self.contract.address,
                    &IETHAirdrop::claimAndSwapToLevxCall {
                        merkleRoot: root,
                        merkleProof: proof,
                        amount,
                        amountOutMin: amount_out_min,
                        beneficiary: ctx.account,
                        deadline: ctx.deadline(),
                    },
                )
            }
        };
        Ok(call)
    }
}
