// Path: crates/state/src/merkle/mod.rs
//! Range Merkle accumulator over an ordered sequence of evidence leaves.
//!
//! Every node carries the half-open interval of leaf indices it covers. A
//! parent hashes its children's hashes together with the outer bounds of its
//! interval, so a proof commits to position as well as membership:
//!
//! `parent = sha256(left.hash || right.hash || be64(left.lower) || be64(right.upper))`
//!
//! Levels pair adjacent nodes left to right. A trailing node without a partner
//! is lifted to the next level unchanged; in a proof it is matched with an
//! empty sibling `{0^32, [upper, upper)}`. Nothing is ever padded into a hash,
//! so the right subtree of an unbalanced tree is simply shorter and every
//! path has `ceil(log2(n))` entries.

use std::collections::HashSet;
use viper_crypto::algorithms::hash::sha256_concat;
use viper_types::app::{Hash32, HashRange, MerkleProof, Proof};
use viper_types::error::MerkleError;

fn parent(left: &HashRange, right: &HashRange) -> HashRange {
    HashRange {
        hash: sha256_concat(&[
            &left.hash,
            &right.hash,
            &left.lower.to_be_bytes(),
            &right.upper.to_be_bytes(),
        ]),
        lower: left.lower,
        upper: right.upper,
    }
}

fn leaf_nodes(leaf_hashes: &[Hash32]) -> Vec<HashRange> {
    leaf_hashes
        .iter()
        .zip(0u64..)
        .map(|(hash, i)| HashRange {
            hash: *hash,
            lower: i,
            upper: i + 1,
        })
        .collect()
}

fn next_level(level: &[HashRange]) -> Vec<HashRange> {
    level
        .chunks(2)
        .filter_map(|pair| match (pair.first(), pair.get(1)) {
            (Some(left), Some(right)) => Some(parent(left, right)),
            (Some(single), None) => Some(*single),
            _ => None,
        })
        .collect()
}

/// The number of siblings in a proof over `total` leaves: `ceil(log2(total))`.
pub fn proof_length(total: u64) -> usize {
    if total <= 1 {
        return 0;
    }
    (u64::BITS - (total - 1).leading_zeros()) as usize
}

/// Root over `[0, n)` of the given leaf hashes.
pub fn root_from_leaf_hashes(leaf_hashes: &[Hash32]) -> Result<HashRange, MerkleError> {
    let mut level = leaf_nodes(leaf_hashes);
    while level.len() > 1 {
        level = next_level(&level);
    }
    level.first().copied().ok_or(MerkleError::EmptyTree)
}

/// Membership proof for leaf `index` over the given leaf hashes.
pub fn proof_from_leaf_hashes(
    leaf_hashes: &[Hash32],
    index: u64,
) -> Result<MerkleProof, MerkleError> {
    let total = leaf_hashes.len() as u64;
    if total == 0 {
        return Err(MerkleError::EmptyTree);
    }
    let out_of_range = MerkleError::IndexOutOfRange { index, total };
    if index >= total {
        return Err(out_of_range);
    }

    let mut level = leaf_nodes(leaf_hashes);
    let mut idx = usize::try_from(index).map_err(|_| out_of_range.clone())?;
    let target = level.get(idx).copied().ok_or_else(|| out_of_range.clone())?;
    let mut hash_ranges = Vec::with_capacity(proof_length(total));

    while level.len() > 1 {
        let node = level.get(idx).copied().ok_or_else(|| out_of_range.clone())?;
        let sibling = if idx % 2 == 0 {
            level
                .get(idx + 1)
                .copied()
                .unwrap_or_else(|| HashRange::empty_at(node.upper))
        } else {
            level
                .get(idx - 1)
                .copied()
                .ok_or_else(|| out_of_range.clone())?
        };
        hash_ranges.push(sibling);
        level = next_level(&level);
        idx /= 2;
    }

    Ok(MerkleProof {
        target,
        hash_ranges,
        target_index: index,
    })
}

/// Root over `[0, n)` of the SCALE-hashed leaves.
pub fn generate_root(leaves: &[Proof]) -> Result<HashRange, MerkleError> {
    let hashes: Vec<Hash32> = leaves.iter().map(Proof::hash).collect();
    root_from_leaf_hashes(&hashes)
}

/// Membership proof for leaf `index`.
pub fn generate_proof(leaves: &[Proof], index: u64) -> Result<MerkleProof, MerkleError> {
    let hashes: Vec<Hash32> = leaves.iter().map(Proof::hash).collect();
    proof_from_leaf_hashes(&hashes, index)
}

/// A repeated non-empty hash along the path, or the target hash reappearing
/// among its siblings, means the claim counted one leaf more than once.
fn detect_replay(proof: &MerkleProof) -> Result<(), MerkleError> {
    let mut seen: HashSet<Hash32> = HashSet::with_capacity(proof.hash_ranges.len() + 1);
    seen.insert(proof.target.hash);
    for sibling in proof.hash_ranges.iter().filter(|s| !s.is_empty()) {
        if !seen.insert(sibling.hash) {
            return Err(MerkleError::Replay);
        }
    }
    Ok(())
}

/// Whether the target and its siblings together span exactly the root's range.
pub fn path_covers_root(root: &HashRange, proof: &MerkleProof) -> bool {
    let nodes = std::iter::once(&proof.target).chain(proof.hash_ranges.iter().filter(|s| !s.is_empty()));
    let lower = nodes.clone().map(|n| n.lower).min();
    let upper = nodes.map(|n| n.upper).max();
    lower == Some(root.lower) && upper == Some(root.upper)
}

/// Walks the path from the leaf to the root, rebuilding every parent.
///
/// Replay is checked before the walk so that a double-counting proof is
/// reported as such even though it cannot reproduce the root.
pub fn validate_proof(
    root: &HashRange,
    proof: &MerkleProof,
    total: u64,
) -> Result<(), MerkleError> {
    if total == 0 {
        return Err(MerkleError::EmptyTree);
    }
    let index = proof.target_index;
    if index >= total {
        return Err(MerkleError::IndexOutOfRange { index, total });
    }
    let expected = proof_length(total);
    if proof.hash_ranges.len() != expected {
        return Err(MerkleError::InvalidPathLength {
            expected,
            got: proof.hash_ranges.len(),
        });
    }
    if root.lower != 0 || root.upper != total {
        return Err(MerkleError::RangeViolation(format!(
            "root covers [{}, {}), expected [0, {})",
            root.lower, root.upper, total
        )));
    }
    detect_replay(proof)?;

    let target = proof.target;
    if target.lower != index || target.upper != index + 1 {
        return Err(MerkleError::RangeViolation(format!(
            "target covers [{}, {}), expected leaf {}",
            target.lower, target.upper, index
        )));
    }

    let mut node = target;
    let mut idx = index;
    for sibling in &proof.hash_ranges {
        if sibling.is_empty() {
            // Only the last node of a level goes unpaired, and it always ends at `total`.
            if idx % 2 == 1 || sibling.lower != node.upper || node.upper != total {
                return Err(MerkleError::RangeViolation(format!(
                    "misplaced empty sibling at {}",
                    sibling.lower
                )));
            }
        } else if idx % 2 == 0 {
            if sibling.lower != node.upper || sibling.upper <= sibling.lower {
                return Err(MerkleError::RangeViolation(format!(
                    "right sibling [{}, {}) does not follow [{}, {})",
                    sibling.lower, sibling.upper, node.lower, node.upper
                )));
            }
            node = parent(&node, sibling);
        } else {
            if sibling.upper != node.lower || sibling.upper <= sibling.lower {
                return Err(MerkleError::RangeViolation(format!(
                    "left sibling [{}, {}) does not precede [{}, {})",
                    sibling.lower, sibling.upper, node.lower, node.upper
                )));
            }
            node = parent(sibling, &node);
        }
        idx /= 2;
    }

    if node != *root {
        tracing::debug!(
            target: "merkle",
            expected = %hex::encode(root.hash),
            rebuilt = %hex::encode(node.hash),
            "merkle root mismatch"
        );
        return Err(MerkleError::RootMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests;
