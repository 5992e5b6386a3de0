pub mod airdrop_merkle_tree;
pub mod campaign;
pub mod csv_entry;
pub mod error;
pub mod merkle_tree;
pub mod tree_node;
pub mod utils;
