// Path: crates/node/src/relay/mod.rs
//! Inbound relays.
//!
//! A client relay is checked against the current session, recorded as
//! evidence and only then forwarded, so the signed commitment exists even if
//! the hosted chain fails. A fisherman sample names the session it audits in
//! `meta.audited_session`; it is served the same way but is neither metered
//! nor recorded.

mod dispatch;

pub use dispatch::*;

use crate::context::NodeContext;
use std::sync::Arc;
use viper_api::forwarder::{HostedChain, RelayForwarder};
use viper_crypto::signing::{sign_relay_response, verify_relay_proof};
use viper_services::claims::max_possible_relays;
use viper_services::session::{check_billable_header, effective_session_size};
use viper_services::staking::get_actor;
use viper_telemetry::relay_metrics;
use viper_telemetry::time::Timer;
use viper_types::app::{Proof, Relay, RelayProof, RelayResponse, Requestor, SessionHeader};
use viper_types::error::{ErrorCode, ViperError};

/// Chain label used for the metrics of fisherman samples.
pub const SAMPLE_METRICS_LABEL: &str = "fisherman_test";

/// Serves relays and dispatch queries for one node.
pub struct RelayHandler {
    ctx: Arc<NodeContext>,
    forwarder: Arc<dyn RelayForwarder>,
}

impl RelayHandler {
    /// A handler forwarding through `forwarder`.
    pub fn new(ctx: Arc<NodeContext>, forwarder: Arc<dyn RelayForwarder>) -> Self {
        Self { ctx, forwarder }
    }

    /// Validates, records, forwards and signs one relay.
    pub async fn handle_relay(&self, relay: Relay) -> Result<RelayResponse, ViperError> {
        let label = match relay.meta.audited_session {
            Some(_) => SAMPLE_METRICS_LABEL.to_string(),
            None => relay.proof.chain.clone(),
        };
        let _timer = Timer::new(|secs| relay_metrics().observe_relay_duration(&label, secs));

        let result = match &relay.meta.audited_session {
            Some(audited) => self.serve_sample(&relay, audited).await,
            None => self.serve(&relay).await,
        };
        match &result {
            Ok(_) => relay_metrics().inc_relays_served(&label),
            Err(e) => {
                relay_metrics().inc_relay_error(&label, e.code());
                if self.ctx.config.relay_errors {
                    tracing::warn!(
                        target: "relay",
                        chain = %relay.proof.chain,
                        entropy = relay.proof.entropy,
                        code = e.code(),
                        error = %e,
                        "relay rejected"
                    );
                } else {
                    tracing::debug!(target: "relay", chain = %relay.proof.chain, code = e.code(), "relay rejected");
                }
            }
        }
        result
    }

    async fn serve(&self, relay: &Relay) -> Result<RelayResponse, ViperError> {
        let proof = &relay.proof;
        let (start, hosted) = self.check_common(relay)?;
        if proof.session_block_height != start {
            return Err(ViperError::InvalidSession(format!(
                "relay for the session at {}, current session opened at {}",
                proof.session_block_height, start
            )));
        }
        if let Some(zone) = &proof.geo_zone {
            let zones = &self.ctx.geo_zones;
            if !zones.zones().is_empty() && !zones.contains(zone) {
                return Err(ViperError::InvalidSession(format!("geo zone {} is not served here", zone)));
            }
        }

        let header = proof.session_header()?;
        let at_start = self
            .ctx
            .chain
            .state_at(start)
            .ok_or(ViperError::EmptyBlockId(start))?;
        let requestor_address = header.requestor_pubkey.address();
        let requestor = get_actor::<Requestor>(at_start.as_ref(), &requestor_address)?
            .ok_or_else(|| ViperError::RequestorNotFound(requestor_address.to_hex()))?;
        if !requestor.authorizes(&proof.chain) {
            return Err(ViperError::UnsupportedBlockchain(format!(
                "requestor {} does not pay for {}",
                requestor_address, proof.chain
            )));
        }
        check_billable_header(&header, &requestor)?;

        let session = self.ctx.session(&header)?;
        let me = self.ctx.address();
        if !session.contains_servicer(&me) {
            return Err(ViperError::NotSessionServicer);
        }

        let max = max_possible_relays(
            &requestor,
            effective_session_size(&header, Some(&requestor), &self.ctx.params),
        );
        let count = self
            .ctx
            .evidence
            .append_bounded(&header, me, Proof::Relay(proof.clone()), Some(max))?;
        tracing::trace!(target: "relay", chain = %proof.chain, count, max, "relay recorded");

        let body = self
            .forwarder
            .forward(&hosted, &relay.payload, self.ctx.config.rpc_timeout())
            .await?;
        self.sign(body, proof.clone())
    }

    async fn serve_sample(&self, relay: &Relay, audited: &SessionHeader) -> Result<RelayResponse, ViperError> {
        let proof = &relay.proof;
        let (start, hosted) = self.check_common(relay)?;
        audited.validate_basic()?;
        if audited.session_block_height != start
            || proof.session_block_height != start
            || proof.chain != audited.chain
        {
            return Err(ViperError::InvalidSession(
                "sample does not match the current audited session".into(),
            ));
        }

        let fisherman = proof.aat.requestor_key()?.address();
        let session = self.ctx.session(audited)?;
        if !session.contains_fisherman(&fisherman) {
            return Err(ViperError::NotSessionFisherman);
        }
        if !session.contains_servicer(&self.ctx.address()) {
            return Err(ViperError::NotSessionServicer);
        }

        let body = self
            .forwarder
            .forward(&hosted, &relay.payload, self.ctx.config.rpc_timeout())
            .await?;
        self.sign(body, proof.clone())
    }

    /// Checks shared by client relays and samples. Returns the current session
    /// start and the hosted endpoint.
    fn check_common(&self, relay: &Relay) -> Result<(u64, HostedChain), ViperError> {
        let chain = &self.ctx.chain;
        if !chain.is_synced() {
            return Err(ViperError::ChainNotSynced);
        }
        let proof = &relay.proof;
        proof.validate_basic()?;
        if relay.request_hash()? != proof.request_hash {
            return Err(ViperError::InvalidRequestHash);
        }

        let height = chain.latest_height();
        let allowance = self
            .ctx
            .config
            .client_block_sync_allowance
            .saturating_mul(self.ctx.params.blocks_per_session);
        if relay.meta.block_height.abs_diff(height) > allowance {
            return Err(ViperError::InvalidBlockHeight(format!(
                "client at {}, node at {}, allowance {} blocks",
                relay.meta.block_height, height, allowance
            )));
        }

        if proof.servicer_pubkey != self.ctx.public_key() {
            return Err(ViperError::InvalidProof(format!(
                "relay addressed to servicer {}",
                proof.servicer_pubkey.address()
            )));
        }
        verify_relay_proof(proof)?;

        if !self.ctx.params.supports_chain(&proof.chain) {
            return Err(ViperError::UnsupportedBlockchain(proof.chain.clone()));
        }
        let hosted = self
            .ctx
            .hosted
            .get(&proof.chain)
            .ok_or_else(|| ViperError::UnsupportedBlockchain(format!("{} is not hosted here", proof.chain)))?;
        Ok((self.ctx.current_session_start(), hosted))
    }

    fn sign(&self, response: String, proof: RelayProof) -> Result<RelayResponse, ViperError> {
        let mut signed = RelayResponse {
            response,
            signature: String::new(),
            proof,
        };
        sign_relay_response(&self.ctx.key, &mut signed)?;
        Ok(signed)
    }
}
