//! Concrete claim and migration flows driven by [crate::controller::ClaimController].

pub mod airdrop;
pub mod dividend;
pub mod grant;
pub mod migrate;
pub mod migrate_lp;
pub mod payout;

use alloy_primitives::{
    utils::{parse_units, ParseUnits},
    Address, U256,
};

use crate::{
    allowance::AllowanceRequirement,
    config::ClaimConfig,
    contracts::IERC20,
    eligibility::{ClaimRecord, Eligibility, EligibilityState, ProofMaterial},
    error::{ClaimError, Result},
    gateway::{self, ChainGateway, ContractCall},
    policy,
};

/// Everything a flow may look at while resolving or building a call.
pub struct FlowContext<'a, G> {
    pub gateway: &'a G,
    pub account: Address,
    pub config: &'a ClaimConfig,
    /// Unix time the step started at
    pub now: u64,
}

impl<'a, G> FlowContext<'a, G> {
    pub fn deadline(&self) -> U256 {
        policy::deadline(self.now, self.config.ttl_secs)
    }
}

/// One kind of claim: where eligibility comes from, what proves a past claim,
/// and which call redeems it.
#[allow(async_fn_in_trait)]
pub trait ClaimFlow {
    fn name(&self) -> String;

    /// Spender approval settlement depends on
    fn allowance(&self) -> Option<AllowanceRequirement> {
        None
    }

    /// Repeatable flows show their history but are not blocked by it.
    fn repeatable(&self) -> bool {
        false
    }

    async fn resolve<G: ChainGateway>(&self, ctx: &FlowContext<'_, G>) -> Result<EligibilityState>;

    async fn claim_record<G: ChainGateway>(
        &self,
        _ctx: &FlowContext<'_, G>,
        _eligibility: &Eligibility,
    ) -> Result<Option<ClaimRecord>> {
        Ok(None)
    }

    /// Builds the settlement call for an eligible account.
    async fn settlement<G: ChainGateway>(
        &self,
        ctx: &FlowContext<'_, G>,
        eligibility: &Eligibility,
    ) -> Result<ContractCall>;
}

/// Eligible when the account holds at least `amount` of `token`.
pub(crate) async fn resolve_balance<G: ChainGateway>(
    ctx: &FlowContext<'_, G>,
    token: Address,
    amount: U256,
) -> Result<EligibilityState> {
    if amount.is_zero() {
        return Ok(EligibilityState::NotEligible);
    }
    let balance = gateway::read(
        ctx.gateway,
        token,
        IERC20::balanceOfCall {
            account: ctx.account,
        },
    )
    .await?
    .balance;
    if balance < amount {
        return Ok(EligibilityState::NotEligible);
    }
    Ok(EligibilityState::Eligible(Eligibility {
        account: ctx.account,
        amount: Some(amount),
        proof: ProofMaterial::None,
    }))
}

/// Parses a human amount such as `1.5` in `token`'s own decimals.
pub async fn parse_token_amount<G: ChainGateway>(
    gateway: &G,
    token: Address,
    value: &str,
) -> Result<U256> {
    let decimals = gateway::read(gateway, token, IERC20::decimalsCall {})
        .await?
        .places;
    match parse_units(value.trim(), decimals) {
        Ok(ParseUnits::U256(amount)) => Ok(amount),
        Ok(ParseUnits::I256(_)) => Err(ClaimError::Config(format!("negative amount {value}"))),
        Err(e) => Err(ClaimError::Config(format!("invalid amount {value}: {e}"))),
    }
}
