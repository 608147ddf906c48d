// Path: crates/storage/src/bloom.rs
//! A fixed-size Bloom filter used as the fast path of the evidence uniqueness
//! check. A hit is only advisory; callers confirm it with a linear scan.

use parity_scale_codec::{Decode, Encode};
use sha2::{Digest, Sha256};

/// Bit positions per item.
pub const NUM_HASHES: u32 = 7;
/// Bits reserved per expected item.
pub const BITS_PER_ITEM: u64 = 10;

/// A Bloom filter with `m ≈ 10·n_expected` bits and `k = 7`, probing by
/// double hashing over SHA-256.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    words: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    /// A filter sized for `expected_items`.
    pub fn new(expected_items: usize) -> Self {
        let wanted = (expected_items.max(1) as u64).saturating_mul(BITS_PER_ITEM);
        let words = wanted.div_ceil(64).max(1);
        Self {
            words: vec![0; usize::try_from(words).unwrap_or(usize::MAX / 64)],
            num_bits: words * 64,
            num_hashes: NUM_HASHES,
        }
    }

    /// The number of bits in the filter.
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    fn positions(&self, item: &[u8]) -> impl Iterator<Item = u64> {
        let digest: [u8; 32] = Sha256::digest(item).into();
        let h1 = digest.first_chunk::<8>().map_or(0, |b| u64::from_be_bytes(*b));
        let h2 = digest
            .get(8..16)
            .and_then(|s| <[u8; 8]>::try_from(s).ok())
            .map_or(1, u64::from_be_bytes)
            | 1;
        let m = self.num_bits.max(1);
        (0..u64::from(self.num_hashes)).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % m)
    }

    /// Records `item`.
    pub fn insert(&mut self, item: &[u8]) {
        let positions: Vec<u64> = self.positions(item).collect();
        for bit in positions {
            if let Some(word) = self.words.get_mut((bit / 64) as usize) {
                *word |= 1 << (bit % 64);
            }
        }
    }

    /// Whether `item` may have been recorded. False means definitely not.
    pub fn may_contain(&self, item: &[u8]) -> bool {
        self.positions(item).all(|bit| {
            self.words
                .get((bit / 64) as usize)
                .is_some_and(|word| word & (1 << (bit % 64)) != 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizing_follows_expected_items() {
        assert_eq!(BloomFilter::new(0).num_bits(), 64);
        assert_eq!(BloomFilter::new(100).num_bits(), 1024);
        assert_eq!(BloomFilter::new(10_000).num_bits(), 100_032);
    }

    #[test]
    fn inserted_items_are_always_found() {
        let mut bloom = BloomFilter::new(1000);
        for i in 0u64..1000 {
            bloom.insert(&i.to_be_bytes());
        }
        assert!((0u64..1000).all(|i| bloom.may_contain(&i.to_be_bytes())));
    }

    #[test]
    fn false_positive_rate_is_low() {
        let mut bloom = BloomFilter::new(1000);
        for i in 0u64..1000 {
            bloom.insert(&i.to_be_bytes());
        }
        let false_hits = (1000u64..11_000)
            .filter(|i| bloom.may_contain(&i.to_be_bytes()))
            .count();
        // ~0.8% expected at 10 bits per item and k = 7.
        assert!(false_hits < 300, "false positives: {}", false_hits);
    }
}
