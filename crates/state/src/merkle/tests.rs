// Path: crates/state/src/merkle/tests.rs
use super::*;
use viper_types::app::{Address, TestResult};

fn hashes(n: u64) -> Vec<Hash32> {
    (0..n)
        .map(|i| viper_crypto::algorithms::hash::sha256(i.to_be_bytes()))
        .collect()
}

fn sample(ts: u64) -> Proof {
    Proof::Test(TestResult {
        servicer_address: Address([5; 20]),
        timestamp: ts,
        latency_ms: 40,
        is_reliable: true,
        notes: None,
    })
}

#[test]
fn proof_length_is_ceil_log2() {
    assert_eq!(proof_length(1), 0);
    assert_eq!(proof_length(2), 1);
    assert_eq!(proof_length(3), 2);
    assert_eq!(proof_length(4), 2);
    assert_eq!(proof_length(5), 3);
    assert_eq!(proof_length(6), 3);
    assert_eq!(proof_length(1024), 10);
    assert_eq!(proof_length(1025), 11);
}

#[test]
fn every_leaf_proves_against_the_root() {
    for n in 1..=17u64 {
        let leaves = hashes(n);
        let root = root_from_leaf_hashes(&leaves).unwrap();
        assert_eq!((root.lower, root.upper), (0, n));
        for i in 0..n {
            let proof = proof_from_leaf_hashes(&leaves, i).unwrap();
            assert_eq!(proof.hash_ranges.len(), proof_length(n), "n={} i={}", n, i);
            assert!(path_covers_root(&root, &proof), "n={} i={}", n, i);
            validate_proof(&root, &proof, n).unwrap();
        }
    }
}

#[test]
fn single_leaf_root_is_the_leaf() {
    let leaves = hashes(1);
    let root = root_from_leaf_hashes(&leaves).unwrap();
    assert_eq!(root.hash, leaves[0]);
    let proof = proof_from_leaf_hashes(&leaves, 0).unwrap();
    assert!(proof.hash_ranges.is_empty());
    assert!(validate_proof(&root, &proof, 1).is_ok());
}

#[test]
fn root_depends_on_leaf_order() {
    let leaves = hashes(6);
    let mut swapped = leaves.clone();
    swapped.swap(0, 1);
    assert_eq!(
        root_from_leaf_hashes(&leaves).unwrap(),
        root_from_leaf_hashes(&leaves).unwrap()
    );
    assert_ne!(
        root_from_leaf_hashes(&leaves).unwrap(),
        root_from_leaf_hashes(&swapped).unwrap()
    );
}

#[test]
fn odd_trailing_leaf_is_lifted_with_empty_sibling() {
    let leaves = hashes(5);
    let proof = proof_from_leaf_hashes(&leaves, 4).unwrap();
    assert!(proof.hash_ranges[0].is_empty());
    assert_eq!(proof.hash_ranges[0], HashRange::empty_at(5));
    assert!(proof.hash_ranges[1].is_empty());
    assert_eq!((proof.hash_ranges[2].lower, proof.hash_ranges[2].upper), (0, 4));
}

#[test]
fn empty_and_out_of_range() {
    assert_eq!(root_from_leaf_hashes(&[]), Err(MerkleError::EmptyTree));
    assert_eq!(
        proof_from_leaf_hashes(&hashes(3), 3),
        Err(MerkleError::IndexOutOfRange { index: 3, total: 3 })
    );
}

#[test]
fn proof_for_another_index_is_rejected() {
    let leaves = hashes(6);
    let root = root_from_leaf_hashes(&leaves).unwrap();
    let mut proof = proof_from_leaf_hashes(&leaves, 2).unwrap();
    proof.target_index = 3;
    assert!(matches!(
        validate_proof(&root, &proof, 6),
        Err(MerkleError::RangeViolation(_))
    ));
}

#[test]
fn wrong_total_or_root_is_rejected() {
    let leaves = hashes(6);
    let root = root_from_leaf_hashes(&leaves).unwrap();
    let proof = proof_from_leaf_hashes(&leaves, 1).unwrap();
    assert!(matches!(
        validate_proof(&root, &proof, 9),
        Err(MerkleError::InvalidPathLength { expected: 4, got: 3 })
    ));

    let mut forged = root;
    forged.hash[0] ^= 1;
    assert_eq!(validate_proof(&forged, &proof, 6), Err(MerkleError::RootMismatch));

    let mut tampered = proof.clone();
    tampered.target.hash[0] ^= 1;
    assert_eq!(validate_proof(&root, &tampered, 6), Err(MerkleError::RootMismatch));
}

#[test]
fn repeated_hash_on_path_is_replay() {
    let leaves = hashes(8);
    let root = root_from_leaf_hashes(&leaves).unwrap();
    let mut proof = proof_from_leaf_hashes(&leaves, 0).unwrap();
    proof.hash_ranges[1].hash = proof.target.hash;
    assert_eq!(validate_proof(&root, &proof, 8), Err(MerkleError::Replay));

    let mut proof = proof_from_leaf_hashes(&leaves, 5).unwrap();
    proof.hash_ranges[2].hash = proof.hash_ranges[0].hash;
    assert_eq!(validate_proof(&root, &proof, 8), Err(MerkleError::Replay));
}

#[test]
fn proof_leaves_hash_through_scale() {
    let leaves: Vec<Proof> = (1..=3).map(sample).collect();
    let root = generate_root(&leaves).unwrap();
    let proof = generate_proof(&leaves, 2).unwrap();
    assert_eq!(proof.target.hash, leaves[2].hash());
    assert!(validate_proof(&root, &proof, 3).is_ok());
}
