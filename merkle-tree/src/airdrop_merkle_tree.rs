use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
    result,
};

use alloy_primitives::{Address, B256, U256};
use indexmap::IndexMap;
use levx_merkle_verify::verify;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    csv_entry::CsvEntry,
    error::{MerkleTreeError, MerkleTreeError::MerkleValidationError},
    merkle_tree::MerkleTree,
    tree_node::TreeNode,
    utils::get_max_total_claim,
};

/// Merkle Tree which will be used to distribute tokens to claimants.
/// Contains all the information necessary to verify claims against the Merkle Tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirdropMerkleTree {
    /// The merkle root, which is committed on-chain
    pub merkle_root: B256,
    pub max_num_nodes: u64,
    pub max_total_claim: U256,
    pub tree_nodes: Vec<TreeNode>,
}

pub type Result<T> = result::Result<T, MerkleTreeError>;

impl AirdropMerkleTree {
    /// Builds the tree in the given order. Leaf order is part of the commitment,
    /// so claimants listed twice are rejected instead of being merged.
    pub fn new(tree_nodes: Vec<TreeNode>) -> Result<Self> {
        let mut tree_nodes_map: IndexMap<Address, TreeNode> = IndexMap::new();
        for tree_node in tree_nodes {
            let claimant = tree_node.claimant;
            if tree_nodes_map.insert(claimant, tree_node).is_some() {
                return Err(MerkleTreeError::DuplicateClaimant(claimant.to_string()));
            }
        }

        let mut tree_nodes: Vec<TreeNode> = tree_nodes_map.into_values().collect();

        let hashed_nodes = tree_nodes.iter().map(TreeNode::hash).collect::<Vec<_>>();
        let tree = MerkleTree::new(&hashed_nodes);

        for (i, tree_node) in tree_nodes.iter_mut().enumerate() {
            tree_node.proof = tree.find_path(i);
        }

        let max_total_claim = get_max_total_claim(&tree_nodes).ok_or_else(|| {
            MerkleValidationError("total claim overflows uint256".to_string())
        })?;
        let tree = AirdropMerkleTree {
            merkle_root: tree.get_root().ok_or(MerkleTreeError::MerkleRootError)?,
            max_num_nodes: tree_nodes.len() as u64,
            max_total_claim,
            tree_nodes,
        };

        info!(
            "created merkle tree with {} nodes and max total claim of {}",
            tree.max_num_nodes, tree.max_total_claim
        );
        tree.validate()?;
        Ok(tree)
    }

    /// Build from csv entries, keeping their order
    pub fn new_from_entries(entries: &[CsvEntry]) -> Result<Self> {
        let tree_nodes = entries
            .iter()
            .map(TreeNode::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(tree_nodes)
    }

    /// Load a merkle tree from a csv path
    pub fn new_from_csv(path: &Path) -> Result<Self> {
        let csv_entries = CsvEntry::new_from_file(path)?;
        Self::new_from_entries(&csv_entries)
    }

    /// Load a serialized merkle tree from file path
    pub fn new_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let tree: AirdropMerkleTree = serde_json::from_reader(reader)?;
        tree.validate()?;

        Ok(tree)
    }

    /// Write a merkle tree to a filepath
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self)?;
        let mut file = File::create(path)?;
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }

    pub fn get_node(&self, claimant: &Address) -> Option<&TreeNode> {
        self.tree_nodes.iter().find(|n| n.claimant == *claimant)
    }

    fn validate(&self) -> Result<()> {
        // validate that the length is equal to the max_num_nodes
        if self.tree_nodes.len() != self.max_num_nodes as usize {
            return Err(MerkleValidationError(format!(
                "Tree nodes length {} does not match max_num_nodes {}",
                self.tree_nodes.len(),
                self.max_num_nodes
            )));
        }

        // validate that sum is equal to max_total_claim
        let sum = get_max_total_claim(&self.tree_nodes);

        if sum != Some(self.max_total_claim) {
            return Err(MerkleValidationError(format!(
                "Tree nodes sum {:?} does not match max_total_claim {}",
                sum, self.max_total_claim
            )));
        }

        self.verify_proof()
    }

    /// verify that the leaves of the merkle tree match the nodes
    pub fn verify_proof(&self) -> Result<()> {
        let root = self.merkle_root;

        // Recreate root given nodes
        let hashed_nodes: Vec<B256> = self.tree_nodes.iter().map(TreeNode::hash).collect();
        let mk = MerkleTree::new(&hashed_nodes);

        if mk.get_root() != Some(root) {
            return Err(MerkleValidationError(
                "Merkle root is invalid given nodes".to_string(),
            ));
        }

        // Verify each node against the root
        for (i, leaf) in hashed_nodes.iter().enumerate() {
            let proof = mk
                .find_path(i)
                .ok_or_else(|| MerkleValidationError("invalid merkle proof".to_string()))?;

            if !verify(&proof, root, *leaf) {
                return Err(MerkleValidationError("invalid merkle proof".to_string()));
            }
        }

        Ok(())
    }
}
