use alloy_primitives::{Address, U256};

use crate::{
    allowance::AllowanceRequirement,
    config::Deployments,
    contracts::ISwapper,
    eligibility::{Eligibility, EligibilityState},
    error::{ClaimError, Result},
    flows::{resolve_balance, ClaimFlow, FlowContext},
    gateway::{ChainGateway, ContractCall},
};

/// Swap an old token one-for-one through the swapper contract.
pub struct MigrateFlow {
    token: Address,
    swapper: Address,
    amount: U256,
}

impl MigrateFlow {
    pub fn new(deployments: &Deployments, amount: U256) -> Self {
        Self {
            token: deployments.migrate_token,
            swapper: deployments.swapper.address,
            amount,
        }
    }
}

impl ClaimFlow for MigrateFlow {
    fn name(&self) -> String {
        "Migrate".to_string()
    }

    fn allowance(&self) -> Option<AllowanceRequirement> {
        Some(AllowanceRequirement {
            token: self.token,
            spender: self.swapper,
        })
    }

    fn repeatable(&self) -> bool {
        true
    }

    async fn resolve<G: ChainGateway>(&self, ctx: &FlowContext<'_, G>) -> Result<EligibilityState> {
        resolve_balance(ctx, self.token, self.amount).await
    }

    async fn settlement<G: ChainGateway>(
        &self,
        ctx: &FlowContext<'_, G>,
        eligibility: &Eligibility,
    ) -> Result<ContractCall> {
        Ok(ContractCall::new(
            self.swapper,
            &ISwapper::swapCall {
                amount: eligibility.amount.ok_or(ClaimError::NotEligible)?,
                to: ctx.account,
            },
        ))
    }
}
