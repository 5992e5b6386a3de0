use std::str::FromStr;

use alloy_primitives::{
    utils::{format_ether, parse_ether},
    Address, U256,
};

use crate::{error::MerkleTreeError, tree_node::TreeNode};

/// Given a set of tree nodes, get the max total claim amount. None on overflow
pub fn get_max_total_claim(nodes: &[TreeNode]) -> Option<U256> {
    nodes
        .iter()
        .try_fold(U256::ZERO, |acc, n| acc.checked_add(n.amount()))
}

/// Parses an address regardless of letter casing.
pub fn parse_address(value: &str) -> Result<Address, MerkleTreeError> {
    Address::from_str(value.trim()).map_err(|_| MerkleTreeError::InvalidAddress(value.to_string()))
}

/// Converts an ether-unit amount (`"10.5"`) to wei.
pub fn parse_amount(value: &str) -> Result<U256, MerkleTreeError> {
    let value = value.trim();
    if value.starts_with('-') {
        return Err(MerkleTreeError::InvalidAmount(value.to_string()));
    }
    parse_ether(value).map_err(|_| MerkleTreeError::InvalidAmount(value.to_string()))
}

/// Converts wei to an ether-unit string.
pub fn format_amount(amount: U256) -> String {
    format_ether(amount)
}
