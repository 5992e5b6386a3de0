use alloy_primitives::{Address, Bytes, U256};
use tracing::debug;

use crate::{
    config::{Deployment, Deployments},
    contracts::ILevxPayout,
    eligibility::{ClaimRecord, Eligibility, EligibilityState, ProofMaterial},
    error::{ClaimError, Result},
    flows::{ClaimFlow, FlowContext},
    gateway::{self, address_topic, uint_topic, ChainGateway, ContractCall, EventFilter},
};

/// Streaming LEVX payout. A stream is found through its `Start` event and can
/// be claimed from repeatedly while it has a pending amount.
pub struct PayoutFlow {
    contract: Deployment,
}

impl PayoutFlow {
    pub fn new(deployments: &Deployments) -> Self {
        Self {
            contract: deployments.levx_payout,
        }
    }

    async fn stream_id<G: ChainGateway>(&self, ctx: &FlowContext<'_, G>) -> Result<Option<U256>> {
        let filter =
            EventFilter::new::<ILevxPayout::Start>(self.contract.address, self.contract.block_number)
                .topic(3, address_topic(ctx.account));
        let events = gateway::query::<G, ILevxPayout::Start>(ctx.gateway, &filter).await?;
        Ok(events.into_iter().next().map(|(event, _)| event.id))
    }
}

impl ClaimFlow for PayoutFlow {
    fn name(&self) -> String {
        "LEVX Payout".to_string()
    }

    fn repeatable(&self) -> bool {
        true
    }

    async fn resolve<G: ChainGateway>(&self, ctx: &FlowContext<'_, G>) -> Result<EligibilityState> {
        let Some(id) = self.stream_id(ctx).await? else {
            return Ok(EligibilityState::NotEligible);
        };
        let pending = gateway::read(
            ctx.gateway,
            self.contract.address,
            ILevxPayout::pendingAmountCall { id },
        )
        .await?
        .amount;
        debug!("payout {id} for {} has {pending} pending", ctx.account);
        Ok(EligibilityState::Eligible(Eligibility {
            account: ctx.account,
            amount: Some(pending),
            proof: ProofMaterial::Stream { id },
        }))
    }

    /// Total claimed so far over every `Claim` of the stream.
    async fn claim_record<G: ChainGateway>(
        &self,
        ctx: &FlowContext<'_, G>,
        eligibility: &Eligibility,
    ) -> Result<Option<ClaimRecord>> {
        let ProofMaterial::Stream { id } = eligibility.proof else {
            return Ok(None);
        };
        let filter =
            EventFilter::new::<ILevxPayout::Claim>(self.contract.address, self.contract.block_number)
                .topic(1, uint_topic(id));
        let events = gateway::query::<G, ILevxPayout::Claim>(ctx.gateway, &filter).await?;
        let Some((_, last)) = events.last() else {
            return Ok(None);
        };
        let (transaction_hash, block_number) = (last.transaction_hash, last.block_number);
        let amount = events
            .iter()
            .fold(U256::ZERO, |total, (event, _)| total.saturating_add(event.amount));
        Ok(Some(ClaimRecord {
            transaction_hash,
            block_number,
            amount,
        }))
    }

    async fn settlement<G: ChainGateway>(
        &self,
        _ctx: &FlowContext<'_, G>,
        eligibility: &Eligibility,
    ) -> Result<ContractCall> {
        let ProofMaterial::Stream { id } = eligibility.proof else {
            return Err(ClaimError::NotEligible);
        };
        Ok(ContractCall::new(
            self.contract.address,
            &ILevxPayout::claimCall {
                id,
                callee: Address::ZERO,
                data: Bytes::new(),
            },
        ))
    }
}
