// Path: crates/types/src/codec.rs

//! Canonical codecs.
//!
//! State, evidence records and Merkle leaves use SCALE (`parity-scale-codec`)
//! for its compact, deterministic encoding. Anything that is signed by a key
//! (AATs, relay proofs, relay responses, QoS reports, ledger messages) uses
//! canonical JSON (RFC 8785: keys sorted lexicographically, no insignificant
//! whitespace) so that signatures stay interoperable with non-Rust clients.

use parity_scale_codec::{Decode, DecodeAll, Encode};
use serde::Serialize;

/// Encodes a value into its canonical SCALE byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Result<Vec<u8>, String> {
    Ok(v.encode())
}

/// Decodes a value from its canonical SCALE byte representation.
///
/// Trailing bytes are rejected.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, String> {
    T::decode_all(&mut &*b).map_err(|e| format!("canonical decode failed: {}", e))
}

/// Serializes a value into canonical JSON bytes.
pub fn to_canonical_json<T: Serialize + ?Sized>(v: &T) -> Result<Vec<u8>, String> {
    serde_jcs::to_vec(v).map_err(|e| format!("canonical json failed: {}", e))
}

/// Hashes the canonical JSON encoding of a value.
pub fn canonical_json_hash<T: Serialize + ?Sized>(v: &T) -> Result<crate::hash::Hash32, String> {
    to_canonical_json(v).map(crate::hash::sha256)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Encode, Decode, Debug, PartialEq, Eq)]
    struct Record {
        id: u32,
        name: String,
        tags: Vec<u8>,
    }

    #[test]
    fn test_canonical_codec_roundtrip() {
        let original = Record {
            id: 42,
            name: "evidence".to_string(),
            tags: vec![1, 2, 3],
        };
        let encoded = to_bytes_canonical(&original).unwrap();
        let decoded = from_bytes_canonical::<Record>(&encoded).unwrap();
        assert_eq!(original, decoded);

        let mut map = BTreeMap::new();
        map.insert("0001".to_string(), 7u64);
        let encoded_map = to_bytes_canonical(&map).unwrap();
        assert_eq!(
            from_bytes_canonical::<BTreeMap<String, u64>>(&encoded_map).unwrap(),
            map
        );
    }

    #[test]
    fn test_canonical_decode_failure() {
        let original = Record {
            id: 99,
            name: "truncated".to_string(),
            tags: vec![10, 20, 30],
        };
        let mut encoded = to_bytes_canonical(&original).unwrap();
        encoded.pop();
        let err = from_bytes_canonical::<Record>(&encoded).unwrap_err();
        assert!(err.contains("canonical decode failed"));

        let mut padded = to_bytes_canonical(&original).unwrap();
        padded.push(0);
        assert!(from_bytes_canonical::<Record>(&padded).is_err());
    }

    #[derive(Serialize, Deserialize)]
    struct Unordered {
        zeta: u64,
        alpha: String,
        middle: bool,
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let v = Unordered {
            zeta: 1,
            alpha: "a".into(),
            middle: true,
        };
        let bytes = to_canonical_json(&v).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"alpha":"a","middle":true,"zeta":1}"#
        );
    }
}
