use std::{fs::File, io::BufReader, path::Path};

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{
    airdrop_merkle_tree::{AirdropMerkleTree, Result},
    error::MerkleTreeError,
    tree_node::TreeNode,
    utils::{format_amount, parse_address, parse_amount},
};

/// What a campaign pays out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    /// Ether, recorded with the zero address as token
    Native,
    /// An ERC-20 token
    Token,
}

/// A published allocation list together with its on-chain commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub name: String,
    pub description: String,
    /// Token being distributed, zero address for ether
    pub token: Address,
    /// Root the airdrop contract checks proofs against
    pub merkle_root: B256,
    /// Total of all entries, ether units
    pub amount: String,
    /// Block the balances were taken at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<u64>,
    /// Ordered `[address, amount]` pairs, amounts in ether units
    pub entries: Vec<(String, String)>,
}

impl Campaign {
    /// Describe an existing tree as a campaign
    pub fn from_tree(
        name: String,
        description: String,
        token: Address,
        snapshot: Option<u64>,
        tree: &AirdropMerkleTree,
    ) -> Self {
        Self {
            name,
            description,
            token,
            merkle_root: tree.merkle_root,
            amount: format_amount(tree.max_total_claim),
            snapshot,
            entries: tree
                .tree_nodes
                .iter()
                .map(|n| (n.claimant.to_checksum(None), format_amount(n.amount)))
                .collect(),
        }
    }

    pub fn asset_kind(&self) -> AssetKind {
        if self.token == Address::ZERO {
            AssetKind::Native
        } else {
            AssetKind::Token
        }
    }

    /// First entry for `account`, compared without regard to letter casing.
    pub fn find_entry(&self, account: &str) -> Option<&(String, String)> {
        let account = account.trim();
        self.entries
            .iter()
            .find(|(address, _)| address.trim().eq_ignore_ascii_case(account))
    }

    pub fn total_amount(&self) -> Result<U256> {
        parse_amount(&self.amount)
    }

    /// Rebuilds the tree from the entries and checks it against the published
    /// root and total.
    pub fn tree(&self) -> Result<AirdropMerkleTree> {
        let nodes = self
            .entries
            .iter()
            .map(|(address, amount)| -> Result<TreeNode> {
                Ok(TreeNode::new(parse_address(address)?, parse_amount(amount)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let tree = AirdropMerkleTree::new(nodes)?;

        if tree.merkle_root != self.merkle_root {
            return Err(MerkleTreeError::MerkleValidationError(format!(
                "campaign {} publishes root {} but its entries hash to {}",
                self.name, self.merkle_root, tree.merkle_root
            )));
        }
        let total = self.total_amount()?;
        if tree.max_total_claim != total {
            return Err(MerkleTreeError::MerkleValidationError(format!(
                "campaign {} publishes total {} but its entries sum to {}",
                self.name,
                self.amount,
                format_amount(tree.max_total_claim)
            )));
        }
        Ok(tree)
    }

    /// Load a list of campaigns from a JSON file
    pub fn load_all(path: &Path) -> Result<Vec<Self>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write_all(campaigns: &[Self], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, campaigns)?;
        Ok(())
    }
}
