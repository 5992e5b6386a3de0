use std::sync::Arc;

use alloy_primitives::U256;
use serde::Serialize;
use tracing::info;

use crate::{
    auth::{AuthSession, Authenticator, LoginMethod},
    config::{Deployment, Deployments},
    contracts::{ILevxDistribution, IZeroMoney},
    eligibility::{ClaimRecord, Eligibility, EligibilityState, ProofMaterial},
    error::{ClaimError, Result},
    flows::{ClaimFlow, FlowContext},
    gateway::{self, uint_topic, ChainGateway, ContractCall, EventFilter, Signature},
    grant::GrantClient,
};

/// Distribution programs paid out against a signed grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrantProgram {
    /// ZERO tokens for verified social accounts
    Zero,
    LevxDistribution,
}

impl GrantProgram {
    /// Authorization service path
    pub fn path(&self) -> &'static str {
        match self {
            GrantProgram::Zero => "/zero/auth",
            GrantProgram::LevxDistribution => "/auth",
        }
    }

    /// Route the identity provider returns to
    pub fn route(&self) -> &'static str {
        match self {
            GrantProgram::Zero => "zero/claim",
            GrantProgram::LevxDistribution => "airdrops/levx",
        }
    }

    pub fn login_methods(&self) -> &'static [LoginMethod] {
        match self {
            GrantProgram::Zero => &[LoginMethod::Twitter],
            GrantProgram::LevxDistribution => &[LoginMethod::Twitter, LoginMethod::Discord],
        }
    }

    pub fn deployment(&self, deployments: &Deployments) -> Deployment {
        match self {
            GrantProgram::Zero => deployments.zero_money,
            GrantProgram::LevxDistribution => deployments.levx_distribution,
        }
    }
}

/// Claim against a grant issued by the authorization service for the
/// authenticated user and the connected account.
pub struct GrantFlow<A> {
    program: GrantProgram,
    client: GrantClient,
    auth: Arc<AuthSession<A>>,
    contract: Deployment,
}

impl<A: Authenticator> GrantFlow<A> {
    pub fn new(
        program: GrantProgram,
        client: GrantClient,
        auth: Arc<AuthSession<A>>,
        deployments: &Deployments,
    ) -> Self {
        Self {
            program,
            client,
            auth,
            contract: program.deployment(deployments),
        }
    }
}

fn grant_parts(eligibility: &Eligibility) -> Result<(U256, Signature)> {
    match &eligibility.proof {
        ProofMaterial::Grant { id, signature } => Ok((*id, *signature)),
        _ => Err(ClaimError::NotEligible),
    }
}

impl<A: Authenticator> ClaimFlow for GrantFlow<A> {
    fn name(&self) -> String {
        match self.program {
            GrantProgram::Zero => "ZERO".to_string(),
            GrantProgram::LevxDistribution => "LEVX Distribution".to_string(),
        }
    }

    async fn resolve<G: ChainGateway>(&self, ctx: &FlowContext<'_, G>) -> Result<EligibilityState> {
        let access_token = self.auth.access_token().await?;
        let grant = self
            .client
            .fetch(self.program.path(), &access_token, ctx.account)
            .await?;
        let id = grant.id()?;
        let amount = grant.amount()?;
        info!("grant {id} resolved for {}", ctx.account);
        Ok(EligibilityState::Eligible(Eligibility {
            account: ctx.account,
            amount,
            proof: ProofMaterial::Grant {
                id,
                signature: grant.signature,
            },
        }))
    }

    async fn claim_record<G: ChainGateway>(
        &self,
        ctx: &FlowContext<'_, G>,
        eligibility: &Eligibility,
    ) -> Result<Option<ClaimRecord>> {
        let (id, _) = grant_parts(eligibility)?;
        let record = match self.program {
            GrantProgram::Zero => {
                let filter = EventFilter::new::<IZeroMoney::Claim>(
                    self.contract.address,
                    self.contract.block_number,
                )
                .topic(1, uint_topic(id));
                gateway::query::<G, IZeroMoney::Claim>(ctx.gateway, &filter)
                    .await?
                    .into_iter()
                    .next()
                    .map(|(event, log)| (event.amount, log))
            }
            GrantProgram::LevxDistribution => {
                let filter = EventFilter::new::<ILevxDistribution::Claim>(
                    self.contract.address,
                    self.contract.block_number,
                )
                .topic(1, uint_topic(id));
                gateway::query::<G, ILevxDistribution::Claim>(ctx.gateway, &filter)
                    .await?
                    .into_iter()
                    .next()
                    .map(|(event, log)| (event.amount, log))
            }
        };
        Ok(record.map(|(amount, log)| ClaimRecord {
            transaction_hash: log.transaction_hash,
            block_number: log.block_number,
            amount,
        }))
    }

    async fn settlement<G: ChainGateway>(
        &self,
        _ctx: &FlowContext<'_, G>,
        eligibility: &Eligibility,
    ) -> Result<ContractCall> {
        let (id, signature) = grant_parts(eligibility)?;
        Ok(match self.program {
            GrantProgram::Zero => ContractCall::new(
                self.contract.address,
                &IZeroMoney::claimCall {
                    id,
                    v: signature.v,
                    r: signature.r,
                    s: signature.s,
                },
            ),
            GrantProgram::LevxDistribution => ContractCall::new(
                self.contract.address,
                &ILevxDistribution::claimCall {
                    id,
                    amount: eligibility.amount.ok_or(ClaimError::NotEligible)?,
                    v: signature.v,
                    r: signature.r,
                    s: signature.s,
                },
            ),
        })
    }
}
