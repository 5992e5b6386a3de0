use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::debug;

use crate::{
    contracts::IERC20,
    gateway::{self, ChainGateway, ContractCall},
};

/// A spender that must be approved on a token before settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllowanceRequirement {
    pub token: Address,
    pub spender: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceStatus {
    pub owner: Address,
    pub token: Address,
    pub spender: Address,
    pub allowance: U256,
    /// `allowance >= threshold`
    pub allowed: bool,
}

impl AllowanceStatus {
    /// Whether this status was read for exactly this owner, token and spender.
    pub fn is_for(&self, owner: Address, requirement: &AllowanceRequirement) -> bool {
        self.owner == owner
            && self.token == requirement.token
            && self.spender == requirement.spender
    }
}

/// Reads the current allowance; always hits the chain.
pub async fn check<G: ChainGateway>(
    gateway: &G,
    owner: Address,
    requirement: &AllowanceRequirement,
    threshold: U256,
) -> gateway::Result<AllowanceStatus> {
    let allowance = gateway::read(
        gateway,
        requirement.token,
        IERC20::allowanceCall {
            owner,
            spender: requirement.spender,
        },
    )
    .await?
    .remaining;
    let allowed = allowance >= threshold;
    debug!(
        "allowance of {} on {} for {owner}: {allowance} (allowed: {allowed})",
        requirement.spender, requirement.token
    );
    Ok(AllowanceStatus {
        owner,
        token: requirement.token,
        spender: requirement.spender,
        allowance,
        allowed,
    })
}

/// `approve(spender, type(uint256).max)` on the token
pub fn approval_call(requirement: &AllowanceRequirement) -> ContractCall {
    ContractCall::new(
        requirement.token,
        &IERC20::approveCall {
            spender: requirement.spender,
            amount: U256::MAX,
        },
    )
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;
    use alloy_sol_types::SolCall;

    use super::*;

    #[test]
    fn test_approval_is_for_full_range() {
        let requirement = AllowanceRequirement {
            token: address!("f474E526ADe9aD2CC2B66ffCE528B1A51B91FCdC"),
            spender: address!("5B38Da6a701c568545dCfcB03FcB875f56beddC4"),
        };
        let call = approval_call(&requirement);
        assert_eq!(call.to, requirement.token);
        let decoded = IERC20::approveCall::abi_decode(&call.data, true).unwrap();
        assert_eq!(decoded.spender, requirement.spender);
        assert_eq!(decoded.amount, U256::MAX);
    }

    #[test]
    fn test_status_is_scoped_to_owner_token_spender() {
        let requirement = AllowanceRequirement {
            token: address!("f474E526ADe9aD2CC2B66ffCE528B1A51B91FCdC"),
            spender: address!("5B38Da6a701c568545dCfcB03FcB875f56beddC4"),
        };
        let owner = address!("Ab8483F64d9C6d1EcF9b849Ae677dD3315835cb2");
        let status = AllowanceStatus {
            owner,
            token: requirement.token,
            spender: requirement.spender,
            allowance: U256::MAX,
            allowed: true,
        };
        assert!(status.is_for(owner, &requirement));
        assert!(!status.is_for(Address::ZERO, &requirement));
        assert!(!status.is_for(
            owner,
            &AllowanceRequirement {
                spender: Address::ZERO,
                ..requirement
            }
        ));
    }
}
