// Path: crates/types/src/error/mod.rs
//! Core error types for the Viper relay core.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors related to the key-value state the keepers read and write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The requested key was not found in the state.
    #[error("Key not found in state")]
    KeyNotFound,
    /// An error occurred in the state backend.
    #[error("State backend error: {0}")]
    Backend(String),
    /// An error occurred while writing to the state.
    #[error("State write error: {0}")]
    WriteError(String),
    /// The provided value was invalid.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// An error occurred during state deserialization.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::KeyNotFound => "STATE_KEY_NOT_FOUND",
            Self::Backend(_) => "STATE_BACKEND_ERROR",
            Self::WriteError(_) => "STATE_WRITE_ERROR",
            Self::InvalidValue(_) => "STATE_INVALID_VALUE",
            Self::Decode(_) => "STATE_DECODE_ERROR",
        }
    }
}

/// Errors from key handling, signing and verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A key could not be parsed or has the wrong length.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    /// A signature is malformed or does not verify.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    /// A hash had an unexpected length.
    #[error("Invalid hash length: expected {expected}, got {got}")]
    InvalidHashLength {
        /// The expected digest length in bytes.
        expected: usize,
        /// The length that was received.
        got: usize,
    },
    /// The payload to be signed could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A key file could not be read or parsed.
    #[error("Key file error: {0}")]
    KeyFile(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::InvalidSignature(_) => "CRYPTO_INVALID_SIGNATURE",
            Self::InvalidHashLength { .. } => "CRYPTO_INVALID_HASH_LENGTH",
            Self::Serialization(_) => "CRYPTO_SERIALIZATION_ERROR",
            Self::KeyFile(_) => "CRYPTO_KEY_FILE_ERROR",
        }
    }
}

/// Outcomes of building or validating a Merkle accumulator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// A root or proof was requested over zero leaves.
    #[error("Merkle tree has no leaves")]
    EmptyTree,
    /// The requested leaf index is outside `[0, total)`.
    #[error("Leaf index {index} out of range for {total} leaves")]
    IndexOutOfRange {
        /// The requested index.
        index: u64,
        /// The number of leaves in the tree.
        total: u64,
    },
    /// The sibling path does not have length `ceil(log2(total))`.
    #[error("Invalid proof path length: expected {expected}, got {got}")]
    InvalidPathLength {
        /// The expected path length.
        expected: usize,
        /// The path length in the proof.
        got: usize,
    },
    /// A reconstructed range is not contiguous or not monotonic.
    #[error("Merkle range violation: {0}")]
    RangeViolation(String),
    /// The reconstructed root does not equal the claimed root.
    #[error("Reconstructed root does not match the claimed root")]
    RootMismatch,
    /// A hash appeared twice along the proof path.
    #[error("Repeated hash along the proof path")]
    Replay,
}

impl ErrorCode for MerkleError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyTree => "MERKLE_EMPTY_TREE",
            Self::IndexOutOfRange { .. } => "MERKLE_INDEX_OUT_OF_RANGE",
            Self::InvalidPathLength { .. } => "MERKLE_INVALID_PATH_LENGTH",
            Self::RangeViolation(_) => "MERKLE_RANGE_VIOLATION",
            Self::RootMismatch => "MERKLE_ROOT_MISMATCH",
            Self::Replay => "MERKLE_REPLAY",
        }
    }
}

/// Errors of the relay, session, evidence and claim/proof pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViperError {
    /// The chain identifier is empty.
    #[error("The chain identifier is empty")]
    EmptyChain,
    /// No block hash is known for the requested height.
    #[error("No block id found for height {0}")]
    EmptyBlockId(u64),
    /// A public key is malformed.
    #[error("Invalid public key: {0}")]
    InvalidPubKey(String),
    /// A signature does not verify.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    /// A relay proof, Merkle proof or leaf is invalid.
    #[error("Invalid proof: {0}")]
    InvalidProof(String),
    /// The Merkle proof does not reconstruct the claimed root.
    #[error("Merkle proof verification failed: {0}")]
    InvalidMerkleVerify(String),
    /// The proof path contains a repeated hash: the claim double-counts a leaf.
    #[error("Replay attack detected: the proof path repeats a hash")]
    ReplayAttack,
    /// The evidence record is unusable.
    #[error("Invalid evidence: {0}")]
    InvalidEvidence(String),
    /// The message did not name an evidence type.
    #[error("No evidence type was provided")]
    NoEvidenceType,
    /// The claim referenced by a proof does not exist.
    #[error("Claim not found")]
    ClaimNotFound,
    /// A claim already exists for this servicer, session and evidence type.
    #[error("A claim already exists for this session")]
    ClaimAlreadyExists,
    /// The requestor is not staked or does not exist.
    #[error("Requestor not found: {0}")]
    RequestorNotFound(String),
    /// The servicer is not staked or does not exist.
    #[error("Servicer not found: {0}")]
    ServicerNotFound(String),
    /// The chain is not supported by the network or not hosted by this node.
    #[error("Unsupported blockchain: {0}")]
    UnsupportedBlockchain(String),
    /// The claim or relay exceeds the requestor's per-servicer quota.
    #[error("Over service: {count} relays exceed the maximum of {max}")]
    OverService {
        /// The number of relays claimed or already served.
        count: u64,
        /// The maximum possible relays for this servicer in this session.
        max: u64,
    },
    /// The servicer is not a member of the session.
    #[error("The servicer is not a member of the session")]
    NotSessionServicer,
    /// The fisherman is not a member of the session's fishermen.
    #[error("The fisherman is not a member of the session")]
    NotSessionFisherman,
    /// The session header or session height is invalid.
    #[error("Invalid session: {0}")]
    InvalidSession(String),
    /// Fewer eligible servicers than the session requires.
    #[error("Insufficient servicers: {available} available, {required} required")]
    InsufficientServicers {
        /// The number of eligible servicers.
        available: u64,
        /// The number of servicers the session requires.
        required: u64,
    },
    /// The reveal window has already opened: the claim is too late.
    #[error("The claim submission window has closed")]
    ExpiredProofs,
    /// The proof was submitted before the reveal block was produced.
    #[error("The claim is not yet mature for a proof")]
    PrematureProof,
    /// The claim was submitted before the session ended.
    #[error("The session has not ended yet")]
    SessionNotOver,
    /// The claim carries fewer proofs than the network minimum.
    #[error("Insufficient proofs: {got} < {min}")]
    InsufficientProofs {
        /// The number of proofs in the claim.
        got: u64,
        /// The network minimum.
        min: u64,
    },
    /// A claim expiration height was supplied that the keeper would not compute.
    #[error("Invalid expiration height")]
    InvalidExpirationHeight,
    /// The node's own servicer record could not be found.
    #[error("Self not found in the staking set")]
    SelfNotFound,
    /// The node key could not be loaded.
    #[error("Keybase error: {0}")]
    KeybaseError(String),
    /// The relay's entropy was already recorded for this session.
    #[error("Duplicate proof: entropy already recorded for this session")]
    DuplicateProof,
    /// The servicer has already served its quota for this session.
    #[error("Quota exceeded: maximum of {max} relays reached")]
    QuotaExceeded {
        /// The maximum possible relays.
        max: u64,
    },
    /// The external chain endpoint failed.
    #[error("Upstream error: {0}")]
    UpstreamError(String),
    /// The evidence has been sealed; no more proofs may be appended.
    #[error("Evidence is sealed")]
    EvidenceSealed,
    /// A Merkle proof was requested from unsealed evidence.
    #[error("Evidence is not sealed")]
    EvidenceNotSealed,
    /// The message type is not known to the router.
    #[error("Unknown request: {0}")]
    UnknownRequest(String),
    /// The node is still catching up.
    #[error("The chain is not synced")]
    ChainNotSynced,
    /// A report card is invalid.
    #[error("Invalid report card: {0}")]
    InvalidReportCard(String),
    /// The AAT version is not in the supported list.
    #[error("Unsupported AAT version: {0}")]
    UnsupportedAatVersion(String),
    /// The relay's block height is outside the sync allowance.
    #[error("Invalid block height: {0}")]
    InvalidBlockHeight(String),
    /// The relay's request hash does not match the payload.
    #[error("The request hash does not match the relay payload")]
    InvalidRequestHash,
    /// A canonical encoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A state error occurred.
    #[error("State error: {0}")]
    State(#[from] StateError),
    /// A cryptographic operation failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ErrorCode for ViperError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyChain => "VIPER_EMPTY_CHAIN",
            Self::EmptyBlockId(_) => "VIPER_EMPTY_BLOCK_ID",
            Self::InvalidPubKey(_) => "VIPER_INVALID_PUBKEY",
            Self::InvalidSignature(_) => "VIPER_INVALID_SIGNATURE",
            Self::InvalidProof(_) => "VIPER_INVALID_PROOF",
            Self::InvalidMerkleVerify(_) => "VIPER_INVALID_MERKLE_VERIFY",
            Self::ReplayAttack => "VIPER_REPLAY_ATTACK",
            Self::InvalidEvidence(_) => "VIPER_INVALID_EVIDENCE",
            Self::NoEvidenceType => "VIPER_NO_EVIDENCE_TYPE",
            Self::ClaimNotFound => "VIPER_CLAIM_NOT_FOUND",
            Self::ClaimAlreadyExists => "VIPER_CLAIM_ALREADY_EXISTS",
            Self::RequestorNotFound(_) => "VIPER_REQUESTOR_NOT_FOUND",
            Self::ServicerNotFound(_) => "VIPER_SERVICER_NOT_FOUND",
            Self::UnsupportedBlockchain(_) => "VIPER_UNSUPPORTED_BLOCKCHAIN",
            Self::OverService { .. } => "VIPER_OVER_SERVICE",
            Self::NotSessionServicer => "VIPER_NOT_SESSION_SERVICER",
            Self::NotSessionFisherman => "VIPER_NOT_SESSION_FISHERMAN",
            Self::InvalidSession(_) => "VIPER_INVALID_SESSION",
            Self::InsufficientServicers { .. } => "VIPER_INSUFFICIENT_SERVICERS",
            Self::ExpiredProofs => "VIPER_EXPIRED_PROOFS",
            Self::PrematureProof => "VIPER_PREMATURE_PROOF",
            Self::SessionNotOver => "VIPER_SESSION_NOT_OVER",
            Self::InsufficientProofs { .. } => "VIPER_INSUFFICIENT_PROOFS",
            Self::InvalidExpirationHeight => "VIPER_INVALID_EXPIRATION_HEIGHT",
            Self::SelfNotFound => "VIPER_SELF_NOT_FOUND",
            Self::KeybaseError(_) => "VIPER_KEYBASE_ERROR",
            Self::DuplicateProof => "VIPER_DUPLICATE_PROOF",
            Self::QuotaExceeded { .. } => "VIPER_QUOTA_EXCEEDED",
            Self::UpstreamError(_) => "VIPER_UPSTREAM_ERROR",
            Self::EvidenceSealed => "VIPER_EVIDENCE_SEALED",
            Self::EvidenceNotSealed => "VIPER_EVIDENCE_NOT_SEALED",
            Self::UnknownRequest(_) => "VIPER_UNKNOWN_REQUEST",
            Self::ChainNotSynced => "VIPER_CHAIN_NOT_SYNCED",
            Self::InvalidReportCard(_) => "VIPER_INVALID_REPORT_CARD",
            Self::UnsupportedAatVersion(_) => "VIPER_UNSUPPORTED_AAT_VERSION",
            Self::InvalidBlockHeight(_) => "VIPER_INVALID_BLOCK_HEIGHT",
            Self::InvalidRequestHash => "VIPER_INVALID_REQUEST_HASH",
            Self::Serialization(_) => "VIPER_SERIALIZATION_ERROR",
            Self::State(_) => "VIPER_STATE_ERROR",
            Self::Crypto(_) => "VIPER_CRYPTO_ERROR",
        }
    }
}

impl From<MerkleError> for ViperError {
    fn from(e: MerkleError) -> Self {
        match e {
            MerkleError::Replay => ViperError::ReplayAttack,
            other => ViperError::InvalidMerkleVerify(other.to_string()),
        }
    }
}

/// Errors of the requestor and servicer staking lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    /// The actor advertises more chains than allowed.
    #[error("Too many chains: {got} > {max}")]
    TooManyChains {
        /// The number of chains in the message.
        got: usize,
        /// The configured maximum.
        max: u64,
    },
    /// The requested session size is outside the configured bounds.
    #[error("num_servicers {got} outside [{min}, {max}]")]
    InvalidNumServicers {
        /// The requested number of servicers.
        got: u64,
        /// The lower bound.
        min: u64,
        /// The upper bound.
        max: u64,
    },
    /// The stake is below the minimum.
    #[error("Stake {got} below the minimum of {min}")]
    MinimumStake {
        /// The amount in the message.
        got: u64,
        /// The configured minimum.
        min: u64,
    },
    /// An edit-stake attempted to lower the stake.
    #[error("Edit stake cannot decrease the stake: {current} -> {new}")]
    StakeDecrease {
        /// The current stake.
        current: u64,
        /// The stake in the message.
        new: u64,
    },
    /// The account cannot cover the stake.
    #[error("Insufficient funds to stake")]
    InsufficientFunds,
    /// The maximum number of staked actors has been reached.
    #[error("Maximum number of actors reached: {0}")]
    MaxActorsReached(u64),
    /// The actor is not staked.
    #[error("Actor is not staked")]
    NotStaked,
    /// The actor is already unstaking.
    #[error("Actor is already unstaking")]
    AlreadyUnstaking,
    /// The actor is jailed.
    #[error("Actor is jailed")]
    Jailed,
    /// The actor is not jailed.
    #[error("Actor is not jailed")]
    NotJailed,
    /// The actor does not exist.
    #[error("Actor not found: {0}")]
    ActorNotFound(String),
    /// The advertised chain is not supported by the network.
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),
    /// The advertised geo zone is not supported by the network.
    #[error("Unsupported geo zone: {0}")]
    UnsupportedGeoZone(String),
    /// A servicer stake message carried an empty or malformed service URL.
    #[error("Invalid service url: {0}")]
    InvalidServiceUrl(String),
    /// The account ledger refused a transfer.
    #[error("Ledger error: {0}")]
    Ledger(String),
    /// A state error occurred.
    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl ErrorCode for StakingError {
    fn code(&self) -> &'static str {
        match self {
            Self::TooManyChains { .. } => "STAKING_TOO_MANY_CHAINS",
            Self::InvalidNumServicers { .. } => "STAKING_INVALID_NUM_SERVICERS",
            Self::MinimumStake { .. } => "STAKING_MINIMUM_STAKE",
            Self::StakeDecrease { .. } => "STAKING_STAKE_DECREASE",
            Self::InsufficientFunds => "STAKING_INSUFFICIENT_FUNDS",
            Self::MaxActorsReached(_) => "STAKING_MAX_ACTORS_REACHED",
            Self::NotStaked => "STAKING_NOT_STAKED",
            Self::AlreadyUnstaking => "STAKING_ALREADY_UNSTAKING",
            Self::Jailed => "STAKING_JAILED",
            Self::NotJailed => "STAKING_NOT_JAILED",
            Self::ActorNotFound(_) => "STAKING_ACTOR_NOT_FOUND",
            Self::UnsupportedChain(_) => "STAKING_UNSUPPORTED_CHAIN",
            Self::UnsupportedGeoZone(_) => "STAKING_UNSUPPORTED_GEO_ZONE",
            Self::InvalidServiceUrl(_) => "STAKING_INVALID_SERVICE_URL",
            Self::Ledger(_) => "STAKING_LEDGER_ERROR",
            Self::State(_) => "STAKING_STATE_ERROR",
        }
    }
}

/// Errors surfaced when a ledger message is routed and handled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// An error occurred during serialization.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error occurred during deserialization.
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    /// The message failed stateless validation.
    #[error("Invalid message: {0}")]
    Invalid(String),
    /// The message type is not known.
    #[error("Unknown request: {0}")]
    UnknownRequest(String),
    /// The transaction signer is not one of the message's signers.
    #[error("Unauthorized signer: {0}")]
    Unauthorized(String),
    /// The transaction's fee was insufficient.
    #[error("Insufficient fee")]
    InsufficientFee,
    /// An error from the relay/claim pipeline.
    #[error("Viper error: {0}")]
    Viper(#[from] ViperError),
    /// An error from the staking lifecycle.
    #[error("Staking error: {0}")]
    Staking(#[from] StakingError),
    /// An error originating from the state.
    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl ErrorCode for TransactionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "TX_SERIALIZATION_ERROR",
            Self::Deserialization(_) => "TX_DESERIALIZATION_ERROR",
            Self::Invalid(_) => "TX_INVALID",
            Self::UnknownRequest(_) => "TX_UNKNOWN_REQUEST",
            Self::Unauthorized(_) => "TX_UNAUTHORIZED",
            Self::InsufficientFee => "TX_INSUFFICIENT_FEE",
            Self::Viper(e) => e.code(),
            Self::Staking(e) => e.code(),
            Self::State(e) => e.code(),
        }
    }
}

impl TransactionError {
    /// The module the error originated from.
    pub fn codespace(&self) -> &'static str {
        match self {
            Self::Viper(_) => "viper",
            Self::Staking(_) => "staking",
            Self::State(_) => "state",
            _ => "tx",
        }
    }
}

impl From<CryptoError> for TransactionError {
    fn from(e: CryptoError) -> Self {
        TransactionError::Viper(ViperError::Crypto(e))
    }
}

impl From<serde_json::Error> for TransactionError {
    fn from(e: serde_json::Error) -> Self {
        TransactionError::Deserialization(e.to_string())
    }
}

/// The outcome of handling one ledger message, reported back to the submitter.
///
/// A failed message never halts block processing; its error is carried here.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct TxResult {
    /// `"OK"` on success, otherwise the stable error code.
    pub code: String,
    /// The module that produced the result.
    pub codespace: String,
    /// A human readable message.
    pub log: String,
}

impl TxResult {
    /// A successful result.
    pub fn ok(codespace: &str) -> Self {
        Self {
            code: "OK".to_string(),
            codespace: codespace.to_string(),
            log: String::new(),
        }
    }

    /// Whether the message was applied.
    pub fn is_ok(&self) -> bool {
        self.code == "OK"
    }
}

impl From<&TransactionError> for TxResult {
    fn from(e: &TransactionError) -> Self {
        Self {
            code: e.code().to_string(),
            codespace: e.codespace().to_string(),
            log: e.to_string(),
        }
    }
}
