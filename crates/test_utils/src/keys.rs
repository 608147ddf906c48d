// Path: crates/test_utils/src/keys.rs
//! Deterministic keys and signed relay fixtures.

use viper_crypto::aat::generate_aat;
use viper_crypto::sign::eddsa::Ed25519KeyPair;
use viper_crypto::signing::sign_relay_proof;
use viper_types::app::{request_hash, Aat, Payload, Relay, RelayMeta, RelayProof, SessionHeader};
use viper_types::error::ViperError;

/// A key pair derived from a seed filled with `n`. Distinct `n` give distinct keys.
pub fn keypair(n: u8) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(&[n; 32])
}

/// An AAT issued by `requestor` to `client`.
pub fn aat_for(requestor: &Ed25519KeyPair, client: &Ed25519KeyPair) -> Result<Aat, ViperError> {
    generate_aat(requestor, &client.viper_public_key())
}

/// A JSON-RPC style payload.
pub fn payload(data: &str) -> Payload {
    Payload {
        data: data.to_string(),
        method: "POST".to_string(),
        ..Default::default()
    }
}

/// A client-signed relay to `servicer` for `header`, at node height `block_height`.
pub fn signed_relay(
    client: &Ed25519KeyPair,
    aat: &Aat,
    header: &SessionHeader,
    servicer: &Ed25519KeyPair,
    entropy: u64,
    block_height: u64,
    data: &str,
) -> Result<Relay, ViperError> {
    let payload = payload(data);
    let meta = RelayMeta {
        block_height,
        audited_session: None,
    };
    let mut proof = RelayProof {
        entropy,
        session_block_height: header.session_block_height,
        servicer_pubkey: servicer.viper_public_key(),
        chain: header.chain.clone(),
        aat: aat.clone(),
        request_hash: request_hash(&payload, &meta)?,
        geo_zone: header.geo_zone.clone(),
        num_servicers: header.num_servicers,
        client_signature: String::new(),
    };
    sign_relay_proof(client, &mut proof)?;
    Ok(Relay {
        payload,
        meta,
        proof,
    })
}
