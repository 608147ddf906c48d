// Path: crates/types/src/app/mod.rs
//! Relay, session, evidence, claim and staking data structures.

/// Staked actors: requestors and servicers.
pub mod actors;
/// The authenticated application token.
pub mod aat;
/// On-chain claims.
pub mod claim;
/// Evidence kinds, Merkle ranges and proof leaves.
pub mod evidence;
/// Ledger messages and their static fee table.
pub mod msgs;
/// Relays, relay proofs and relay responses.
pub mod relay;
/// Fisherman QoS reports and report cards.
pub mod report;
/// The fixed-point score type used in QoS reports.
pub mod score;
/// Session headers and assembled sessions.
pub mod session;

pub use aat::*;
pub use actors::*;
pub use claim::*;
pub use evidence::*;
pub use msgs::*;
pub use relay::*;
pub use report::*;
pub use score::*;
pub use session::*;

use crate::hash::sha256;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub use crate::hash::Hash32;

macro_rules! hex_newtype {
    ($name:ident, $len:expr) => {
        impl $name {
            /// Length of the raw byte representation.
            pub const LEN: usize = $len;

            /// Lowercase hex encoding.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parses a lowercase or uppercase hex string of exactly `LEN` bytes.
            pub fn from_hex(s: &str) -> Result<Self, String> {
                let bytes = hex::decode(s).map_err(|e| format!("invalid hex: {}", e))?;
                Self::try_from(bytes.as_slice())
            }

            /// Whether every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = String;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; $len] = bytes.try_into().map_err(|_| {
                    format!(
                        "expected {} bytes for {}, got {}",
                        $len,
                        stringify!($name),
                        bytes.len()
                    )
                })?;
                Ok(Self(arr))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A raw 32-byte Ed25519 public key.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PublicKey(pub [u8; 32]);
hex_newtype!(PublicKey, 32);

impl PublicKey {
    /// The address derived from this key: the first 20 bytes of its SHA-256 digest.
    pub fn address(&self) -> Address {
        let digest = sha256(self.0);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[..20]);
        Address(out)
    }
}

/// A 20-byte account address.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);
hex_newtype!(Address, 20);

impl Address {
    /// The first byte of the address; used to stagger per-node background work.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// The bitwise complement of the address, used to rank equal-power actors.
    pub fn inverted(&self) -> [u8; 20] {
        let mut out = self.0;
        for b in out.iter_mut() {
            *b = !*b;
        }
        out
    }
}

/// Serde helpers that encode byte fields as lowercase hex strings.
pub mod hex_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    /// A `Vec<u8>` as hex; an empty vector is the empty string.
    pub mod bytes {
        use super::*;

        /// Serializes bytes as hex.
        pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&hex::encode(v))
        }

        /// Deserializes bytes from hex.
        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
            let s = String::deserialize(d)?;
            hex::decode(s).map_err(serde::de::Error::custom)
        }
    }

    /// A 32-byte hash as hex.
    pub mod hash32 {
        use super::*;

        /// Serializes a digest as hex.
        pub fn serialize<S: Serializer>(v: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&hex::encode(v))
        }

        /// Deserializes a digest from hex.
        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
            let s = String::deserialize(d)?;
            let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| serde::de::Error::custom("expected a 32-byte hex digest"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_truncated_key_digest() {
        let pk = PublicKey([7u8; 32]);
        let digest = sha256([7u8; 32]);
        assert_eq!(pk.address().0, digest[..20]);
    }

    #[test]
    fn hex_newtype_json_roundtrip() {
        let addr = Address([0xab; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<PublicKey>(&json).is_err());
    }

    #[test]
    fn inverted_address_flips_every_bit() {
        let addr = Address([0x0f; 20]);
        assert_eq!(addr.inverted(), [0xf0; 20]);
    }
}
