use alloy_primitives::{keccak256, B256};

/// This function deals with verification of Merkle trees (hash trees).
/// Mirrors OpenZeppelin's `MerkleProof.verify`, which is what the airdrop contracts run on-chain.
/// Returns true if a `leaf` can be proved to be a part of a Merkle tree
/// defined by `root`. For this, a `proof` must be provided, containing
/// sibling hashes on the branch from the leaf to the root of the tree. Each
/// pair of leaves and each pair of pre-images are assumed to be sorted.
pub fn verify(proof: &[B256], root: B256, leaf: B256) -> bool {
    let computed_hash = proof
        .iter()
        .fold(leaf, |computed_hash, proof_element| {
            hash_pair(computed_hash, *proof_element)
        });
    // Check if the computed hash (root) is equal to the provided root
    computed_hash == root
}

/// Hash two sibling nodes, smaller one first.
pub fn hash_pair(a: B256, b: B256) -> B256 {
    let (left, right) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_slice());
    buf[32..].copy_from_slice(right.as_slice());
    keccak256(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_pair_is_order_independent() {
        let a = keccak256(b"a");
        let b = keccak256(b"b");
        assert_eq!(hash_pair(a, b), hash_pair(b, a));
    }

    #[test]
    fn test_verify_two_leaf_tree() {
        let a = keccak256(b"alice");
        let b = keccak256(b"bob");
        let root = hash_pair(a, b);

        assert!(verify(&[b], root, a));
        assert!(verify(&[a], root, b));
        assert!(!verify(&[a], root, a));
    }

    #[test]
    fn test_single_leaf_tree_has_empty_proof() {
        let leaf = keccak256(b"only");
        assert!(verify(&[], leaf, leaf));
    }
}
