// Path: crates/node/src/relay/dispatch.rs
//! Dispatch: tells a client which servicers make up its session.

use super::RelayHandler;
use serde::{Deserialize, Serialize};
use viper_api::state::StateAccess;
use viper_services::session::check_billable_header;
use viper_services::staking::get_actor;
use viper_types::app::{
    hex_serde, Address, Hash32, PublicKey, Requestor, Servicer, Session, SessionHeader, SessionNode,
};
use viper_types::error::ViperError;

/// A client's session query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// The paying requestor.
    pub requestor_pubkey: PublicKey,
    /// The relayed chain.
    pub chain: String,
    /// The requestor's primary geo zone; filled in when omitted.
    #[serde(default)]
    pub geo_zone: Option<String>,
    /// The requestor's staked session size; filled in when omitted.
    #[serde(default)]
    pub num_servicers: Option<u64>,
    /// The session start; zero asks for the current session.
    #[serde(default)]
    pub session_block_height: u64,
}

/// A session with its members' endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DispatchSession {
    /// The session header.
    pub header: SessionHeader,
    /// The session key.
    #[serde(with = "hex_serde::hash32")]
    pub key: Hash32,
    /// The servicers, in session order.
    pub servicers: Vec<SessionNode>,
    /// The fishermen, in session order.
    pub fishermen: Vec<SessionNode>,
}

/// The answer to a [`DispatchRequest`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    /// The requested session.
    pub session: DispatchSession,
    /// The node's height when it answered.
    pub block_height: u64,
}

fn resolve(live: &dyn StateAccess, addresses: &[Address]) -> Result<Vec<SessionNode>, ViperError> {
    addresses
        .iter()
        .map(|address| {
            let url = get_actor::<Servicer>(live, address)?
                .map(|s| s.service_url)
                .unwrap_or_default();
            Ok(SessionNode {
                address: *address,
                url,
            })
        })
        .collect()
}

impl RelayHandler {
    /// Builds (or reads from the cache) the session a client asked for.
    pub fn handle_dispatch(&self, request: &DispatchRequest) -> Result<DispatchResponse, ViperError> {
        let ctx = &self.ctx;
        if !ctx.chain.is_synced() {
            return Err(ViperError::ChainNotSynced);
        }
        let height = if request.session_block_height == 0 {
            ctx.current_session_start()
        } else {
            request.session_block_height
        };
        if height > ctx.chain.latest_height() {
            return Err(ViperError::InvalidSession(format!(
                "session at {} has not started",
                height
            )));
        }
        if !ctx.params.supports_chain(&request.chain) {
            return Err(ViperError::UnsupportedBlockchain(request.chain.clone()));
        }
        let at_start = ctx.chain.state_at(height).ok_or(ViperError::EmptyBlockId(height))?;
        let requestor_address = request.requestor_pubkey.address();
        let requestor = get_actor::<Requestor>(at_start.as_ref(), &requestor_address)?
            .ok_or_else(|| ViperError::RequestorNotFound(requestor_address.to_hex()))?;
        let header = SessionHeader {
            requestor_pubkey: request.requestor_pubkey,
            chain: request.chain.clone(),
            session_block_height: height,
            geo_zone: request
                .geo_zone
                .clone()
                .or_else(|| requestor.geo_zones.first().cloned()),
            num_servicers: request.num_servicers.or(requestor.num_servicers),
        };
        // Only the header the requestor staked for is billable.
        check_billable_header(&header, &requestor)?;
        if let Some(zone) = &header.geo_zone {
            if !ctx.params.supports_geo_zone(zone) {
                return Err(ViperError::InvalidSession(format!("unsupported geo zone {}", zone)));
            }
        }

        let session: std::sync::Arc<Session> = ctx.session(&header)?;
        let live = ctx.live_state()?;
        let response = DispatchResponse {
            session: DispatchSession {
                header: session.header.clone(),
                key: session.key,
                servicers: resolve(live.as_ref(), &session.servicers)?,
                fishermen: resolve(live.as_ref(), &session.fishermen)?,
            },
            block_height: ctx.chain.latest_height(),
        };
        tracing::debug!(
            target: "relay",
            chain = %header.chain,
            height,
            servicers = response.session.servicers.len(),
            "dispatched session"
        );
        Ok(response)
    }
}
