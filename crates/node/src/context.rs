// Path: crates/node/src/context.rs
//! State shared by the relay handler, the fisherman and the worker.

use crate::hosted::{HostedChains, HostedGeoZones};
use std::sync::Arc;
use viper_api::chain::ChainView;
use viper_api::state::StateAccess;
use viper_crypto::sign::eddsa::Ed25519KeyPair;
use viper_services::session::SessionCache;
use viper_storage::EvidenceStore;
use viper_types::app::{session_start_height, Address, PublicKey, Session, SessionHeader};
use viper_types::config::{NodeConfig, ViperParams};
use viper_types::error::ViperError;

/// One node's identity, configuration and local stores.
pub struct NodeContext {
    /// Local configuration.
    pub config: NodeConfig,
    /// The on-chain parameters the node runs under.
    pub params: ViperParams,
    /// The node's signing key.
    pub key: Ed25519KeyPair,
    /// The host chain.
    pub chain: Arc<dyn ChainView>,
    /// Sessions, shared with the ledger-side keepers of the same process.
    pub sessions: Arc<SessionCache>,
    /// The node's private evidence.
    pub evidence: Arc<EvidenceStore>,
    /// The chains this node relays to.
    pub hosted: Arc<HostedChains>,
    /// The geo zones this node serves.
    pub geo_zones: Arc<HostedGeoZones>,
}

impl NodeContext {
    /// The node's public key.
    pub fn public_key(&self) -> PublicKey {
        self.key.viper_public_key()
    }

    /// The node's address.
    pub fn address(&self) -> Address {
        self.key.address()
    }

    /// The first block of the session the chain head is in.
    pub fn current_session_start(&self) -> u64 {
        session_start_height(self.chain.latest_height(), self.params.blocks_per_session)
    }

    /// The current state, failing when the host has none committed yet.
    pub fn live_state(&self) -> Result<Arc<dyn StateAccess>, ViperError> {
        let height = self.chain.latest_height();
        self.chain.latest_state().ok_or(ViperError::EmptyBlockId(height))
    }

    /// The session of `header`, from the cache or assembled from the chain.
    pub fn session(&self, header: &SessionHeader) -> Result<Arc<Session>, ViperError> {
        let live = self.live_state()?;
        self.sessions
            .session(self.chain.as_ref(), live.as_ref(), &self.params, header)
    }
}
