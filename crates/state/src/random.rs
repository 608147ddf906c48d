// Path: crates/state/src/random.rs
//! Pseudorandom draws derived from block hashes.
//!
//! Digests are read as 256-bit big-endian integers and reduced exactly modulo
//! `n`, so every node computes the same index without big-integer support.

use viper_crypto::algorithms::hash::{sha256, sha256_concat, Hash32};
use viper_types::app::SessionHeader;

/// `int(digest) mod n`, reading the digest as a big-endian integer. Zero when `n == 0`.
pub fn reduce_digest(digest: &Hash32, n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let modulus = u128::from(n);
    let rem = digest
        .iter()
        .fold(0u128, |acc, byte| ((acc << 8) | u128::from(*byte)) % modulus);
    // rem < n <= u64::MAX
    rem as u64
}

/// `PRS(n, key) = int(sha256(key)) mod n`.
pub fn prs(n: u64, key: &Hash32) -> u64 {
    reduce_digest(&sha256(key), n)
}

/// `sha256(requestor_pubkey || chain || block_hash)`.
pub fn session_key(header: &SessionHeader, block_hash: &Hash32) -> Hash32 {
    sha256_concat(&[
        &header.requestor_pubkey.0,
        header.chain.as_bytes(),
        block_hash,
    ])
}

/// The leaf a claim must prove: `int(sha256(reveal_block_hash || sha256(header))) mod total`.
pub fn pseudorandom_index(total: u64, header: &SessionHeader, reveal_block_hash: &Hash32) -> u64 {
    let header_hash = header.hash();
    reduce_digest(&sha256_concat(&[reveal_block_hash, &header_hash]), total)
}

/// The draw sequence of a session: each draw uses the current key, then the
/// key is re-hashed so repeated draws do not collide.
#[derive(Debug, Clone)]
pub struct KeyStream {
    key: Hash32,
}

impl KeyStream {
    /// Starts a stream at `key`.
    pub fn new(key: Hash32) -> Self {
        Self { key }
    }

    /// Draws an index in `[0, n)` and advances the key.
    pub fn draw(&mut self, n: u64) -> u64 {
        let index = prs(n, &self.key);
        self.key = sha256(self.key);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viper_types::app::PublicKey;

    #[test]
    fn reduction_matches_native_arithmetic() {
        let mut digest = [0u8; 32];
        digest[16..].copy_from_slice(&0x0123_4567_89ab_cdef_fedc_ba98_7654_3210u128.to_be_bytes());
        for n in [1u64, 2, 5, 97, 1_000_003, u64::MAX] {
            let expected = (0x0123_4567_89ab_cdef_fedc_ba98_7654_3210u128 % u128::from(n)) as u64;
            assert_eq!(reduce_digest(&digest, n), expected);
        }
        assert_eq!(reduce_digest(&[0xff; 32], 0), 0);
        assert!(reduce_digest(&[0xff; 32], 7) < 7);
    }

    #[test]
    fn high_bytes_affect_the_result() {
        let mut a = [0u8; 32];
        a[31] = 3;
        let mut b = a;
        b[0] = 1;
        // 2^248 = 4 (mod 7)
        assert_eq!(reduce_digest(&a, 7), 3);
        assert_eq!(reduce_digest(&b, 7), 0);
    }

    #[test]
    fn key_stream_rehashes_between_draws() {
        let key = sha256(b"session");
        let mut stream = KeyStream::new(key);
        let first = stream.draw(1_000_000);
        assert_eq!(first, prs(1_000_000, &key));
        let second = stream.draw(1_000_000);
        assert_eq!(second, prs(1_000_000, &sha256(key)));
    }

    #[test]
    fn pseudorandom_index_depends_on_block_and_header() {
        let header = SessionHeader::new(PublicKey([1; 32]), "0001", 1);
        let other = SessionHeader::new(PublicKey([2; 32]), "0001", 1);
        let block = [7u8; 32];
        let i = pseudorandom_index(1 << 40, &header, &block);
        assert_eq!(i, pseudorandom_index(1 << 40, &header, &block));
        assert_ne!(i, pseudorandom_index(1 << 40, &other, &block));
        assert_ne!(i, pseudorandom_index(1 << 40, &header, &[8u8; 32]));
        assert_eq!(pseudorandom_index(1, &header, &block), 0);
    }

    #[test]
    fn session_key_binds_chain() {
        let header = SessionHeader::new(PublicKey([1; 32]), "0001", 1);
        let mut other_chain = header.clone();
        other_chain.chain = "0002".into();
        assert_ne!(session_key(&header, &[0; 32]), session_key(&other_chain, &[0; 32]));
    }
}
