use crate::{
    config::{Deployment, Deployments},
    contracts::IZeroMoney,
    eligibility::{Eligibility, EligibilityState, ProofMaterial},
    error::Result,
    flows::{ClaimFlow, FlowContext},
    gateway::{self, ChainGateway, ContractCall},
};

/// Withdraw the ZERO dividend accrued to the account.
pub struct DividendFlow {
    contract: Deployment,
}

impl DividendFlow {
    pub fn new(deployments: &Deployments) -> Self {
        Self {
            contract: deployments.zero_money,
        }
    }
}

impl ClaimFlow for DividendFlow {
    fn name(&self) -> String {
        "ZERO Dividend".to_string()
    }

    fn repeatable(&self) -> bool {
        true
    }

    async fn resolve<G: ChainGateway>(&self, ctx: &FlowContext<'_, G>) -> Result<EligibilityState> {
        let withdrawable = gateway::read(
            ctx.gateway,
            self.contract.address,
            IZeroMoney::withdrawableDividendOfCall { owner: ctx.account },
        )
        .await?
        .amount;
        Ok(EligibilityState::Eligible(Eligibility {
            account: ctx.account,
            amount: Some(withdrawable),
            proof: ProofMaterial::None,
        }))
    }

    async fn settlement<G: ChainGateway>(
        &self,
        _ctx: &FlowContext<'_, G>,
        _eligibility: &Eligibility,
    ) -> Result<ContractCall> {
        Ok(ContractCall::new(
            self.contract.address,
            &IZeroMoney::withdrawDividendCall {},
        ))
    }
}
