//! Whether, and for how much, an account may claim.

use alloy_primitives::{Address, B256, U256};
use levx_merkle_tree::{
    airdrop_merkle_tree::AirdropMerkleTree,
    campaign::{AssetKind, Campaign},
    utils::parse_amount,
};
use levx_merkle_verify::verify;
use serde::Serialize;
use tracing::debug;

use crate::{
    error::{ClaimError, Result},
    gateway::Signature,
};

/// What the settlement call needs to redeem an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProofMaterial {
    Merkle { root: B256, proof: Vec<B256> },
    Grant { id: U256, signature: Signature },
    Stream { id: U256 },
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    /// Account this was resolved for
    pub account: Address,
    /// `None` when the allocation size is only known on chain
    pub amount: Option<U256>,
    pub proof: ProofMaterial,
}

impl Eligibility {
    /// An amount of exactly zero means there is nothing to submit.
    pub fn is_claimable(&self) -> bool {
        self.amount.map_or(true, |amount| !amount.is_zero())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum EligibilityState {
    #[default]
    Unresolved,
    NotEligible,
    Eligible(Eligibility),
}

impl EligibilityState {
    pub fn eligible(&self) -> Option<&Eligibility> {
        match self {
            EligibilityState::Eligible(eligibility) => Some(eligibility),
            _ => None,
        }
    }
}

/// Evidence from event history that the allocation was claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub transaction_hash: Option<B256>,
    pub block_number: Option<u64>,
    /// Amount claimed, summed over all events for repeatable claims
    pub amount: U256,
}

/// A campaign with its tree built and checked against the published root.
#[derive(Debug, Clone)]
pub struct AllocationTable {
    campaign: Campaign,
    tree: AirdropMerkleTree,
}

impl AllocationTable {
    pub fn new(campaign: Campaign) -> Result<Self> {
        let tree = campaign.tree()?;
        Ok(Self { campaign, tree })
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn asset_kind(&self) -> AssetKind {
        self.campaign.asset_kind()
    }

    pub fn merkle_root(&self) -> B256 {
        self.tree.merkle_root
    }

    /// Amount recorded for `account` and its proof, `None` if absent.
    pub fn resolve(&self, account: Address) -> Result<Option<Eligibility>> {
        let Some((_, amount)) = self.campaign.find_entry(&account.to_string()) else {
            debug!("{account} is not in {}", self.campaign.name);
            return Ok(None);
        };
        let amount = parse_amount(amount)?;

        let node = self.tree.get_node(&account).ok_or_else(|| {
            ClaimError::Dataset(format!("{account} is listed but missing from the tree"))
        })?;
        let proof = node.proof.clone().unwrap_or_default();
        if node.amount() != amount || !verify(&proof, self.tree.merkle_root, node.hash()) {
            return Err(ClaimError::Dataset(format!(
                "proof for {account} does not verify against {}",
                self.tree.merkle_root
            )));
        }

        Ok(Some(Eligibility {
            account,
            amount: Some(amount),
            proof: ProofMaterial::Merkle {
                root: self.tree.merkle_root,
                proof,
            },
        }))
    }
}
