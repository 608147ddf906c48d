// Path: crates/types/src/app/msgs.rs
//! Ledger messages. The host delivers them as a tagged union; each variant owns
//! its data and knows its route, type name, signers, sign bytes, stateless
//! validation and fee.

use super::{Address, EvidenceType, HashRange, MerkleProof, Proof, PublicKey, QosReport, SessionHeader};
use crate::codec::to_canonical_json;
use crate::error::{TransactionError, ViperError};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Route of the requestor staking module.
pub const REQUESTORS_ROUTE: &str = "requestors";
/// Route of the servicer staking module.
pub const SERVICERS_ROUTE: &str = "servicers";
/// Route of the claim/proof keeper.
pub const VIPER_ROUTE: &str = "viper";

/// Flat fee per message type, in the stake denomination.
pub const FEE_TABLE: &[(&str, u64)] = &[
    ("stake_requestor", 10_000),
    ("begin_unstake_requestor", 10_000),
    ("unjail_requestor", 10_000),
    ("stake_servicer", 10_000),
    ("begin_unstake_servicer", 10_000),
    ("unjail_servicer", 10_000),
    ("claim", 10_000),
    ("proof", 10_000),
    ("submit_report_card", 10_000),
];

/// Stake or edit the stake of a requestor.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct MsgStakeRequestor {
    /// The requestor key.
    pub public_key: PublicKey,
    /// Chains to pay for.
    pub chains: Vec<String>,
    /// Preferred geo zones.
    #[serde(default)]
    pub geo_zones: Vec<String>,
    /// Total stake after the message is applied.
    pub amount: u64,
    /// Preferred session size.
    #[serde(default)]
    pub num_servicers: Option<u64>,
}

/// Begin unstaking a requestor.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct MsgBeginUnstakeRequestor {
    /// The requestor address.
    pub address: Address,
}

/// Unjail a requestor.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct MsgUnjailRequestor {
    /// The requestor address.
    pub address: Address,
}

/// Stake or edit the stake of a servicer.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct MsgStakeServicer {
    /// The servicer key.
    pub public_key: PublicKey,
    /// Chains relayed to.
    pub chains: Vec<String>,
    /// Advertised geo zones.
    #[serde(default)]
    pub geo_zones: Vec<String>,
    /// The public relay endpoint.
    pub service_url: String,
    /// Total stake after the message is applied.
    pub amount: u64,
}

/// Begin unstaking a servicer.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct MsgBeginUnstakeServicer {
    /// The servicer address.
    pub address: Address,
}

/// Unjail a servicer.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct MsgUnjailServicer {
    /// The servicer address.
    pub address: Address,
}

/// Commit to the Merkle root of sealed evidence.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct MsgClaim {
    /// The session.
    pub header: SessionHeader,
    /// Root over `[0, total_proofs)`.
    pub merkle_root: HashRange,
    /// Number of sealed leaves.
    pub total_proofs: u64,
    /// The claiming servicer.
    pub from_address: Address,
    /// The evidence kind; required.
    pub evidence_type: Option<EvidenceType>,
    /// Must be zero; the keeper computes it.
    #[serde(default)]
    pub expiration_height: u64,
}

/// Reveal one pseudorandomly selected leaf of a claim.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct MsgProof {
    /// Membership proof of the leaf.
    pub merkle_proof: MerkleProof,
    /// The revealed leaf.
    pub leaf: Proof,
    /// The evidence kind; required.
    pub evidence_type: Option<EvidenceType>,
}

/// Submit a fisherman's QoS report for one servicer.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct MsgSubmitReportCard {
    /// The audited session.
    pub header: SessionHeader,
    /// The rated servicer.
    pub servicer: Address,
    /// The reporting fisherman.
    pub fisherman: Address,
    /// The signed scores.
    pub report: QosReport,
    /// Must be `FishermanTest`.
    pub evidence_type: Option<EvidenceType>,
}

/// Every message the relay core handles.
#[derive(Serialize, Deserialize, Encode, Decode, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Msg {
    /// See [`MsgStakeRequestor`].
    StakeRequestor(MsgStakeRequestor),
    /// See [`MsgBeginUnstakeRequestor`].
    BeginUnstakeRequestor(MsgBeginUnstakeRequestor),
    /// See [`MsgUnjailRequestor`].
    UnjailRequestor(MsgUnjailRequestor),
    /// See [`MsgStakeServicer`].
    StakeServicer(MsgStakeServicer),
    /// See [`MsgBeginUnstakeServicer`].
    BeginUnstakeServicer(MsgBeginUnstakeServicer),
    /// See [`MsgUnjailServicer`].
    UnjailServicer(MsgUnjailServicer),
    /// See [`MsgClaim`].
    Claim(MsgClaim),
    /// See [`MsgProof`].
    Proof(MsgProof),
    /// See [`MsgSubmitReportCard`].
    SubmitReportCard(MsgSubmitReportCard),
}

impl Msg {
    /// The module that handles the message.
    pub fn route(&self) -> &'static str {
        match self {
            Msg::StakeRequestor(_) | Msg::BeginUnstakeRequestor(_) | Msg::UnjailRequestor(_) => {
                REQUESTORS_ROUTE
            }
            Msg::StakeServicer(_) | Msg::BeginUnstakeServicer(_) | Msg::UnjailServicer(_) => {
                SERVICERS_ROUTE
            }
            Msg::Claim(_) | Msg::Proof(_) | Msg::SubmitReportCard(_) => VIPER_ROUTE,
        }
    }

    /// The type tag, as used on the wire and in the fee table.
    pub fn type_name(&self) -> &'static str {
        match self {
            Msg::StakeRequestor(_) => "stake_requestor",
            Msg::BeginUnstakeRequestor(_) => "begin_unstake_requestor",
            Msg::UnjailRequestor(_) => "unjail_requestor",
            Msg::StakeServicer(_) => "stake_servicer",
            Msg::BeginUnstakeServicer(_) => "begin_unstake_servicer",
            Msg::UnjailServicer(_) => "unjail_servicer",
            Msg::Claim(_) => "claim",
            Msg::Proof(_) => "proof",
            Msg::SubmitReportCard(_) => "submit_report_card",
        }
    }

    /// Addresses that must sign the transaction carrying this message.
    pub fn signers(&self) -> Vec<Address> {
        let signer = match self {
            Msg::StakeRequestor(m) => m.public_key.address(),
            Msg::BeginUnstakeRequestor(m) => m.address,
            Msg::UnjailRequestor(m) => m.address,
            Msg::StakeServicer(m) => m.public_key.address(),
            Msg::BeginUnstakeServicer(m) => m.address,
            Msg::UnjailServicer(m) => m.address,
            Msg::Claim(m) => m.from_address,
            Msg::Proof(m) => m.leaf.submitter(),
            Msg::SubmitReportCard(m) => m.fisherman,
        };
        vec![signer]
    }

    /// Canonical JSON of the tagged message.
    pub fn sign_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        to_canonical_json(self).map_err(TransactionError::Serialization)
    }

    /// The flat fee for this message type.
    pub fn fee(&self) -> u64 {
        let name = self.type_name();
        FEE_TABLE
            .iter()
            .find(|(t, _)| *t == name)
            .map(|(_, fee)| *fee)
            .unwrap_or(0)
    }

    /// Decodes a message from its type tag and JSON body.
    pub fn from_type_and_json(type_name: &str, value: serde_json::Value) -> Result<Msg, TransactionError> {
        let msg = match type_name {
            "stake_requestor" => Msg::StakeRequestor(serde_json::from_value(value)?),
            "begin_unstake_requestor" => Msg::BeginUnstakeRequestor(serde_json::from_value(value)?),
            "unjail_requestor" => Msg::UnjailRequestor(serde_json::from_value(value)?),
            "stake_servicer" => Msg::StakeServicer(serde_json::from_value(value)?),
            "begin_unstake_servicer" => Msg::BeginUnstakeServicer(serde_json::from_value(value)?),
            "unjail_servicer" => Msg::UnjailServicer(serde_json::from_value(value)?),
            "claim" => Msg::Claim(serde_json::from_value(value)?),
            "proof" => Msg::Proof(serde_json::from_value(value)?),
            "submit_report_card" => Msg::SubmitReportCard(serde_json::from_value(value)?),
            other => return Err(TransactionError::UnknownRequest(other.to_string())),
        };
        Ok(msg)
    }

    /// Stateless validation.
    pub fn validate_basic(&self) -> Result<(), TransactionError> {
        match self {
            Msg::StakeRequestor(m) => {
                if m.public_key.is_zero() {
                    return Err(ViperError::InvalidPubKey("empty requestor key".into()).into());
                }
                validate_chains(&m.chains)?;
                if m.num_servicers == Some(0) {
                    return Err(TransactionError::Invalid("num_servicers is zero".into()));
                }
                Ok(())
            }
            Msg::StakeServicer(m) => {
                if m.public_key.is_zero() {
                    return Err(ViperError::InvalidPubKey("empty servicer key".into()).into());
                }
                validate_chains(&m.chains)?;
                if !(m.service_url.starts_with("http://") || m.service_url.starts_with("https://")) {
                    return Err(TransactionError::Invalid(format!(
                        "service url must be http(s): {:?}",
                        m.service_url
                    )));
                }
                Ok(())
            }
            Msg::BeginUnstakeRequestor(MsgBeginUnstakeRequestor { address })
            | Msg::UnjailRequestor(MsgUnjailRequestor { address })
            | Msg::BeginUnstakeServicer(MsgBeginUnstakeServicer { address })
            | Msg::UnjailServicer(MsgUnjailServicer { address }) => {
                if address.is_zero() {
                    return Err(TransactionError::Invalid("empty address".into()));
                }
                Ok(())
            }
            Msg::Claim(m) => {
                m.header.validate_basic()?;
                let kind = m.evidence_type.ok_or(ViperError::NoEvidenceType)?;
                if kind == EvidenceType::FishermanTest {
                    return Err(ViperError::InvalidEvidence(
                        "fisherman samples are reported through report cards".into(),
                    )
                    .into());
                }
                if m.total_proofs == 0 {
                    return Err(ViperError::InvalidProof("claim has no proofs".into()).into());
                }
                if m.merkle_root.lower != 0 || m.merkle_root.upper != m.total_proofs {
                    return Err(ViperError::InvalidProof(format!(
                        "root range [{}, {}) does not cover {} proofs",
                        m.merkle_root.lower, m.merkle_root.upper, m.total_proofs
                    ))
                    .into());
                }
                if m.expiration_height != 0 {
                    return Err(ViperError::InvalidExpirationHeight.into());
                }
                if m.from_address.is_zero() {
                    return Err(TransactionError::Invalid("empty claimant".into()));
                }
                Ok(())
            }
            Msg::Proof(m) => {
                let kind = m.evidence_type.ok_or(ViperError::NoEvidenceType)?;
                if kind != m.leaf.evidence_type() {
                    return Err(ViperError::InvalidEvidence(format!(
                        "leaf is {:?} but message says {:?}",
                        m.leaf.evidence_type(),
                        kind
                    ))
                    .into());
                }
                if kind == EvidenceType::FishermanTest {
                    return Err(ViperError::InvalidEvidence(
                        "fisherman samples are reported through report cards".into(),
                    )
                    .into());
                }
                let target = &m.merkle_proof.target;
                if target.lower != m.merkle_proof.target_index
                    || target.upper != m.merkle_proof.target_index.saturating_add(1)
                {
                    return Err(ViperError::InvalidProof("target range does not match index".into()).into());
                }
                if target.hash != m.leaf.hash() {
                    return Err(ViperError::InvalidProof("target hash does not match leaf".into()).into());
                }
                m.leaf.validate_basic()?;
                Ok(())
            }
            Msg::SubmitReportCard(m) => {
                m.header.validate_basic()?;
                if m.evidence_type != Some(EvidenceType::FishermanTest) {
                    return Err(ViperError::InvalidReportCard("evidence type must be FishermanTest".into()).into());
                }
                if m.servicer.is_zero() || m.fisherman.is_zero() {
                    return Err(ViperError::InvalidReportCard("empty servicer or fisherman".into()).into());
                }
                if !m.report.scores_valid() {
                    return Err(ViperError::InvalidReportCard("score outside [0, 1]".into()).into());
                }
                if m.report.signature.is_empty() {
                    return Err(ViperError::InvalidReportCard("unsigned report".into()).into());
                }
                if m.report.sample_root.lower != 0 || m.report.sample_root.upper == 0 {
                    return Err(ViperError::InvalidReportCard("empty sample root".into()).into());
                }
                Ok(())
            }
        }
    }
}

fn validate_chains(chains: &[String]) -> Result<(), TransactionError> {
    if chains.is_empty() {
        return Err(TransactionError::Invalid("no chains".into()));
    }
    if chains.iter().any(|c| c.is_empty()) {
        return Err(ViperError::EmptyChain.into());
    }
    Ok(())
}
