// Path: crates/crypto/src/sign/eddsa/tests/mod.rs
use super::*;

#[test]
fn test_keypair_generation() {
    let keypair = Ed25519KeyPair::generate();
    let message = b"Test message";

    let signature = keypair.sign(message).unwrap();

    let public_key = keypair.public_key();
    assert!(public_key.verify(message, &signature).is_ok());
    assert!(public_key.verify(b"other message", &signature).is_err());
}

#[test]
fn test_serialization_roundtrip() {
    let keypair = Ed25519KeyPair::generate();

    let public_bytes = keypair.public_key().to_bytes();
    let private_bytes = keypair.private_key().to_bytes();
    assert_eq!(public_bytes.len(), 32);
    assert_eq!(private_bytes.len(), 32); // Just the seed

    let public_key = Ed25519PublicKey::from_bytes(&public_bytes).unwrap();
    let private_key = Ed25519PrivateKey::from_bytes(&private_bytes).unwrap();
    assert_eq!(public_key.to_bytes(), private_key.public_key().to_bytes());
}

#[test]
fn test_sign_verify_with_loaded_keys() {
    let original = Ed25519KeyPair::generate();
    let message = b"Test message for persistence";
    let original_sig = original.sign(message).unwrap();

    let loaded_private = Ed25519PrivateKey::from_bytes(&original.private_key().to_bytes()).unwrap();
    let reconstructed = Ed25519KeyPair::from_private_key(&loaded_private);
    let new_sig = reconstructed.sign(message).unwrap();

    // Ed25519 signatures are deterministic.
    assert_eq!(original_sig.to_bytes(), new_sig.to_bytes());
}

#[test]
fn test_hex_signatures_against_wire_keys() {
    let keypair = Ed25519KeyPair::from_seed(&[5u8; 32]);
    let sig = keypair.sign_hex(b"payload");
    assert_eq!(sig.len(), 128);
    assert!(verify_hex(&keypair.viper_public_key(), b"payload", &sig).is_ok());

    let other = Ed25519KeyPair::from_seed(&[6u8; 32]);
    assert!(matches!(
        verify_hex(&other.viper_public_key(), b"payload", &sig),
        Err(CryptoError::InvalidSignature(_))
    ));
    assert!(verify_hex(&keypair.viper_public_key(), b"payload", "nothex").is_err());
    assert!(verify_hex(&keypair.viper_public_key(), b"payload", "abcd").is_err());
}

#[test]
fn test_invalid_key_lengths() {
    assert!(matches!(
        Ed25519PublicKey::from_bytes(&[1u8; 31]),
        Err(CryptoError::InvalidKey(_))
    ));
    assert!(Ed25519PrivateKey::from_bytes(&[1u8; 33]).is_err());
}
