use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{
    csv_entry::CsvEntry,
    error::MerkleTreeError,
    utils::{parse_address, parse_amount},
};

/// Represents the claim information for an account.
#[derive(Debug, Clone, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Account allowed to claim
    pub claimant: Address,
    /// Amount that claimant can claim, in wei
    pub amount: U256,
    /// Claimant's proof of inclusion in the Merkle Tree
    pub proof: Option<Vec<B256>>,
}

impl TreeNode {
    pub fn new(claimant: Address, amount: U256) -> Self {
        Self {
            claimant,
            amount,
            proof: None,
        }
    }

    /// Leaf hash, `keccak256(abi.encodePacked(claimant, amount))`
    pub fn hash(&self) -> B256 {
        let mut buf = [0u8; 52];
        buf[..20].copy_from_slice(self.claimant.as_slice());
        buf[20..].copy_from_slice(&self.amount.to_be_bytes::<32>());
        keccak256(buf)
    }

    /// Return amount for this claimant
    pub fn amount(&self) -> U256 {
        self.amount
    }
}

impl TryFrom<&CsvEntry> for TreeNode {
    type Error = MerkleTreeError;

    fn try_from(entry: &CsvEntry) -> Result<Self, Self::Error> {
        Ok(Self::new(
            parse_address(&entry.address)?,
            parse_amount(&entry.amount)?,
        ))
    }
}
