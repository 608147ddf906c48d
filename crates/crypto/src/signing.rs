// Path: crates/crypto/src/signing.rs
//! Signing and verification of relay proofs, relay responses and QoS reports.
//! Every payload is the SHA-256 of the object's canonical JSON with its own
//! signature field blanked.

use crate::aat::validate_aat;
use crate::sign::eddsa::{verify_hex, Ed25519KeyPair};
use viper_types::app::{PublicKey, QosReport, RelayProof, RelayResponse};
use viper_types::error::ViperError;

/// Attaches the client signature to `proof`.
pub fn sign_relay_proof(client: &Ed25519KeyPair, proof: &mut RelayProof) -> Result<(), ViperError> {
    let digest = proof.signable_hash()?;
    proof.client_signature = client.sign_hex(&digest);
    Ok(())
}

/// Verifies the client signature under the AAT's client key.
pub fn verify_relay_proof_signature(proof: &RelayProof) -> Result<(), ViperError> {
    let client = proof.aat.client_key()?;
    let digest = proof.signable_hash()?;
    verify_hex(&client, &digest, &proof.client_signature)
        .map_err(|e| ViperError::InvalidSignature(format!("client: {}", e)))
}

/// Verifies both the client signature and the AAT.
pub fn verify_relay_proof(proof: &RelayProof) -> Result<(), ViperError> {
    validate_aat(&proof.aat)?;
    verify_relay_proof_signature(proof)
}

/// Attaches the servicer signature to `response`.
pub fn sign_relay_response(
    servicer: &Ed25519KeyPair,
    response: &mut RelayResponse,
) -> Result<(), ViperError> {
    let digest = response.signable_hash()?;
    response.signature = servicer.sign_hex(&digest);
    Ok(())
}

/// Verifies a relay response under the servicer key named by its proof.
pub fn verify_relay_response(response: &RelayResponse) -> Result<(), ViperError> {
    let digest = response.signable_hash()?;
    verify_hex(&response.proof.servicer_pubkey, &digest, &response.signature)
        .map_err(|e| ViperError::InvalidSignature(format!("servicer: {}", e)))
}

/// Attaches the fisherman signature to `report`.
pub fn sign_report(fisherman: &Ed25519KeyPair, report: &mut QosReport) -> Result<(), ViperError> {
    let digest = report.signable_hash()?;
    report.signature = fisherman.sign_hex(&digest);
    Ok(())
}

/// Verifies a report under the fisherman key.
pub fn verify_report(fisherman: &PublicKey, report: &QosReport) -> Result<(), ViperError> {
    let digest = report.signable_hash()?;
    verify_hex(fisherman, &digest, &report.signature)
        .map_err(|e| ViperError::InvalidSignature(format!("fisherman: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aat::generate_aat;
    use viper_types::app::{HashRange, Score};

    fn signed_proof(client: &Ed25519KeyPair, requestor: &Ed25519KeyPair) -> RelayProof {
        let mut proof = RelayProof {
            entropy: 1,
            session_block_height: 1,
            servicer_pubkey: Ed25519KeyPair::from_seed(&[9; 32]).viper_public_key(),
            chain: "0001".into(),
            aat: generate_aat(requestor, &client.viper_public_key()).unwrap(),
            request_hash: [1; 32],
            geo_zone: None,
            num_servicers: None,
            client_signature: String::new(),
        };
        sign_relay_proof(client, &mut proof).unwrap();
        proof
    }

    #[test]
    fn relay_proof_sign_verify() {
        let client = Ed25519KeyPair::from_seed(&[2; 32]);
        let requestor = Ed25519KeyPair::from_seed(&[1; 32]);
        let mut proof = signed_proof(&client, &requestor);
        assert!(verify_relay_proof(&proof).is_ok());

        proof.entropy = 2;
        assert!(matches!(
            verify_relay_proof_signature(&proof),
            Err(ViperError::InvalidSignature(_))
        ));
    }

    #[test]
    fn proof_signed_by_wrong_client_fails() {
        let client = Ed25519KeyPair::from_seed(&[2; 32]);
        let requestor = Ed25519KeyPair::from_seed(&[1; 32]);
        let mut proof = signed_proof(&client, &requestor);
        let intruder = Ed25519KeyPair::from_seed(&[7; 32]);
        sign_relay_proof(&intruder, &mut proof).unwrap();
        assert!(verify_relay_proof(&proof).is_err());
    }

    #[test]
    fn response_and_report_signatures() {
        let servicer = Ed25519KeyPair::from_seed(&[9; 32]);
        let client = Ed25519KeyPair::from_seed(&[2; 32]);
        let requestor = Ed25519KeyPair::from_seed(&[1; 32]);
        let mut response = RelayResponse {
            response: "{\"result\":\"0x10\"}".into(),
            signature: String::new(),
            proof: signed_proof(&client, &requestor),
        };
        sign_relay_response(&servicer, &mut response).unwrap();
        assert!(verify_relay_response(&response).is_ok());
        response.response.push(' ');
        assert!(verify_relay_response(&response).is_err());

        let fisherman = Ed25519KeyPair::from_seed(&[4; 32]);
        let mut report = QosReport {
            latency_score: Score::ONE,
            availability_score: Score::ONE,
            reliability_score: Score::ONE,
            sample_root: HashRange::default(),
            nonce: 3,
            signature: String::new(),
            first_sample_timestamp: 1,
            block_height: 5,
        };
        sign_report(&fisherman, &mut report).unwrap();
        assert!(verify_report(&fisherman.viper_public_key(), &report).is_ok());
        assert!(verify_report(&servicer.viper_public_key(), &report).is_err());
    }
}
