// Path: crates/node/src/fisherman/mod.rs
//! The fisherman: QoS sampling of session servicers.
//!
//! When the session draw makes this node a fisherman, it periodically sends
//! every servicer of the audited session a signed sample relay, records each
//! outcome as fisherman-test evidence, and once the session is over folds the
//! samples into a signed QoS report card.
//!
//! Samples carry a token the fisherman issues to itself, so servicers know
//! not to meter them against a requestor's quota.

mod pool;
mod qos;

pub use pool::SamplePool;
pub use qos::{fold_samples, AcceptSigned, QosScores, ReliabilityOracle};

use crate::client::ServicerClient;
use crate::context::NodeContext;
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use viper_api::staking::RequestorView;
use viper_api::transaction::{BroadcastError, TxBroadcaster};
use viper_crypto::aat::generate_aat;
use viper_crypto::signing::{sign_relay_proof, sign_report, verify_relay_response};
use viper_services::staking::{get_actor, RequestorStateView};
use viper_storage::{EvidenceInfo, EvidenceKey};
use viper_telemetry::{fisherman_metrics, worker_metrics};
use viper_types::app::{
    request_hash, session_end_height, submission_deadline, Address, EvidenceType, Msg, MsgSubmitReportCard,
    Payload, Proof, PublicKey, QosReport, Relay, RelayMeta, RelayProof, RelayResponse, Servicer, Session,
    SessionHeader, TestResult,
};
use viper_types::error::{ErrorCode, ViperError};

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Samples audited sessions and reports on them.
pub struct Fisherman {
    ctx: Arc<NodeContext>,
    client: Arc<dyn ServicerClient>,
    broadcaster: Arc<dyn TxBroadcaster>,
    pool: SamplePool,
    oracle: Arc<dyn ReliabilityOracle>,
    // Sample timestamps key the samples of one servicer; keep them unique.
    last_sample: AtomicU64,
}

impl Fisherman {
    /// A fisherman drawing payloads from `pool` and judging answers with `oracle`.
    pub fn new(
        ctx: Arc<NodeContext>,
        client: Arc<dyn ServicerClient>,
        broadcaster: Arc<dyn TxBroadcaster>,
        pool: SamplePool,
        oracle: Arc<dyn ReliabilityOracle>,
    ) -> Self {
        Self {
            ctx,
            client,
            broadcaster,
            pool,
            oracle,
            last_sample: AtomicU64::new(0),
        }
    }

    fn next_timestamp(&self) -> u64 {
        let now = unix_millis();
        let bump = |last: u64| now.max(last.saturating_add(1));
        match self
            .last_sample
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(bump(last)))
        {
            Ok(last) | Err(last) => bump(last),
        }
    }

    /// Half the relay timeout: a servicer answering this fast scores full latency.
    pub fn expected_latency_ms(&self) -> u64 {
        (self.ctx.config.rpc_timeout().as_millis() / 2) as u64
    }

    /// Current sessions that list this node among their fishermen.
    pub fn audited_sessions(&self) -> Result<Vec<Arc<Session>>, ViperError> {
        let ctx = &self.ctx;
        let start = ctx.current_session_start();
        let at_start = ctx.chain.state_at(start).ok_or(ViperError::EmptyBlockId(start))?;
        let requestors = RequestorStateView::new(at_start.as_ref()).staked_requestors()?;
        let me = ctx.address();

        let mut audited = Vec::new();
        for requestor in requestors {
            for chain in requestor
                .chains
                .iter()
                .filter(|c| ctx.params.supports_chain(c) && self.pool.covers(c))
            {
                let header = SessionHeader::new(requestor.public_key, chain.clone(), start);
                match ctx.session(&header) {
                    Ok(session) if session.contains_fisherman(&me) => audited.push(session),
                    Ok(_) => {}
                    Err(e) => tracing::debug!(
                        target: "fisherman",
                        requestor = %requestor.address,
                        chain = %chain,
                        error = %e,
                        "no session to audit"
                    ),
                }
            }
        }
        Ok(audited)
    }

    /// Samples every audited session once. Returns the number of samples recorded.
    pub async fn sample_round(&self) -> usize {
        if !self.ctx.chain.is_synced() {
            return 0;
        }
        let sessions = match self.audited_sessions() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(target: "fisherman", error = %e, "cannot list audited sessions");
                return 0;
            }
        };
        let mut recorded = 0;
        for session in sessions {
            recorded += self.sample_session(&session).await;
        }
        recorded
    }

    /// Sends one sample to each servicer of `session` concurrently.
    pub async fn sample_session(&self, session: &Session) -> usize {
        let me = self.ctx.address();
        let targets: Vec<Servicer> = match self.ctx.live_state() {
            Ok(live) => session
                .servicers
                .iter()
                .filter(|a| **a != me)
                .filter_map(|a| get_actor::<Servicer>(live.as_ref(), a).ok().flatten())
                .collect(),
            Err(e) => {
                tracing::warn!(target: "fisherman", error = %e, "no live state to resolve servicers");
                return 0;
            }
        };

        let outcomes = join_all(
            targets
                .iter()
                .map(|servicer| self.sample_servicer(&session.header, servicer)),
        )
        .await;
        outcomes
            .into_iter()
            .filter(|r| match r {
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(target: "fisherman", error = %e, "sample not recorded");
                    false
                }
            })
            .count()
    }

    async fn sample_servicer(&self, header: &SessionHeader, servicer: &Servicer) -> Result<TestResult, ViperError> {
        let payload = self
            .pool
            .draw(&header.chain)
            .ok_or_else(|| ViperError::UnsupportedBlockchain(format!("no sample payloads for {}", header.chain)))?;
        let relay = self.sample_relay(header, servicer.public_key, payload)?;

        let timestamp = self.next_timestamp();
        let started = Instant::now();
        let outcome = self
            .client
            .send_relay(&servicer.service_url, &relay, self.ctx.config.rpc_timeout())
            .await
            .and_then(|response| check_response(&relay, response));
        let elapsed = started.elapsed();

        let result = match outcome {
            Ok(response) => {
                fisherman_metrics().inc_samples("ok");
                fisherman_metrics().observe_sample_latency(elapsed.as_secs_f64());
                TestResult {
                    servicer_address: servicer.address,
                    timestamp,
                    latency_ms: elapsed.as_millis() as u64,
                    is_reliable: self.oracle.judge(&header.chain, &relay.payload, &response.response),
                    notes: None,
                }
            }
            Err(e) => {
                fisherman_metrics().inc_samples("missed");
                TestResult {
                    servicer_address: servicer.address,
                    timestamp,
                    latency_ms: elapsed.as_millis() as u64,
                    is_reliable: false,
                    notes: Some(e.to_string()),
                }
            }
        };
        self.ctx
            .evidence
            .append(header, servicer.address, Proof::Test(result.clone()))?;
        tracing::trace!(
            target: "fisherman",
            servicer = %servicer.address,
            latency_ms = result.latency_ms,
            missed = result.notes.is_some(),
            "sample recorded"
        );
        Ok(result)
    }

    /// A relay to `servicer` signed by this node as both requestor and client.
    pub fn sample_relay(&self, audited: &SessionHeader, servicer: PublicKey, payload: Payload) -> Result<Relay, ViperError> {
        let key = &self.ctx.key;
        let meta = RelayMeta {
            block_height: self.ctx.chain.latest_height(),
            audited_session: Some(audited.clone()),
        };
        let mut proof = RelayProof {
            entropy: rand::random(),
            session_block_height: audited.session_block_height,
            servicer_pubkey: servicer,
            chain: audited.chain.clone(),
            aat: generate_aat(key, &key.viper_public_key())?,
            request_hash: request_hash(&payload, &meta)?,
            geo_zone: audited.geo_zone.clone(),
            num_servicers: audited.num_servicers,
            client_signature: String::new(),
        };
        sign_relay_proof(key, &mut proof)?;
        Ok(Relay { payload, meta, proof })
    }

    /// Reports on every finished audited session whose samples are ready.
    /// Returns the number of report cards broadcast; an insufficient-fee
    /// failure stops the pass.
    pub async fn submit_reports(&self, height: u64) -> Result<usize, BroadcastError> {
        let params = &self.ctx.params;
        let bps = params.blocks_per_session;
        let mut submitted = 0;
        for info in self
            .ctx
            .evidence
            .iter()
            .into_iter()
            .filter(|i| i.key.kind == EvidenceType::FishermanTest)
        {
            let end = session_end_height(info.header.session_block_height, bps);
            if height <= end {
                continue;
            }
            let deadline = submission_deadline(
                info.header.session_block_height,
                params.report_card_submission_window,
                bps,
            );
            if height > deadline {
                self.discard(&info.key, "expired");
                continue;
            }
            if info.num_proofs < params.minimum_sample_relays {
                self.discard(&info.key, "insufficient_samples");
                continue;
            }
            let msg = match self.build_report(&info, height) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(target: "fisherman", servicer = %info.key.servicer, error = %e, "cannot build report");
                    self.discard(&info.key, "invalid");
                    continue;
                }
            };
            let servicer = msg.servicer;
            match self.broadcaster.broadcast(Msg::SubmitReportCard(msg)).await {
                Ok(tx) => {
                    fisherman_metrics().inc_reports_submitted();
                    submitted += 1;
                    tracing::info!(
                        target: "fisherman",
                        servicer = %servicer,
                        samples = info.num_proofs,
                        tx = %hex::encode(tx),
                        "report card submitted"
                    );
                    if let Err(e) = self.ctx.evidence.delete(&info.key) {
                        tracing::error!(target: "fisherman", error = %e, "cannot delete reported samples");
                    }
                }
                Err(BroadcastError::InsufficientFee) => {
                    worker_metrics().inc_broadcast_failures(BroadcastError::InsufficientFee.code());
                    tracing::warn!(target: "fisherman", "insufficient fee funds; reports resume next session");
                    return Err(BroadcastError::InsufficientFee);
                }
                Err(e) => {
                    worker_metrics().inc_broadcast_failures(e.code());
                    tracing::warn!(target: "fisherman", servicer = %servicer, error = %e, "report card broadcast failed");
                }
            }
        }
        Ok(submitted)
    }

    fn build_report(&self, info: &EvidenceInfo, height: u64) -> Result<MsgSubmitReportCard, ViperError> {
        let (root, _) = self.ctx.evidence.seal_and_root(&info.key)?;
        let samples: Vec<TestResult> = self
            .ctx
            .evidence
            .proofs(&info.key)
            .into_iter()
            .filter_map(|p| match p {
                Proof::Test(t) => Some(t),
                _ => None,
            })
            .collect();
        let scores = fold_samples(&samples, self.expected_latency_ms())
            .ok_or_else(|| ViperError::InvalidEvidence("no samples".into()))?;
        let mut report = QosReport {
            latency_score: scores.latency,
            availability_score: scores.availability,
            reliability_score: scores.reliability,
            sample_root: root,
            nonce: rand::random(),
            signature: String::new(),
            first_sample_timestamp: scores.first_sample_timestamp,
            block_height: height,
        };
        sign_report(&self.ctx.key, &mut report)?;
        Ok(MsgSubmitReportCard {
            header: info.header.clone(),
            servicer: info.key.servicer,
            fisherman: self.ctx.address(),
            report,
            evidence_type: Some(EvidenceType::FishermanTest),
        })
    }

    fn discard(&self, key: &EvidenceKey, reason: &'static str) {
        worker_metrics().inc_evidence_discarded(reason);
        tracing::debug!(target: "fisherman", servicer = %key.servicer, reason, "discarding samples");
        if let Err(e) = self.ctx.evidence.delete(key) {
            tracing::error!(target: "fisherman", error = %e, "cannot delete samples");
        }
    }

    /// Samples every `interval` until `shutdown` flips.
    pub fn spawn_sampler(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let recorded = self.sample_round().await;
                        if recorded > 0 {
                            tracing::debug!(target: "fisherman", recorded, "sampling round done");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

/// A response only counts when the sampled servicer signed it over the
/// proof it was sent.
fn check_response(relay: &Relay, response: RelayResponse) -> Result<RelayResponse, ViperError> {
    verify_relay_response(&response)?;
    if response.proof != relay.proof {
        return Err(ViperError::InvalidProof("response signs a different proof".into()));
    }
    Ok(response)
}

/// The evidence key of this node's samples of `servicer` in `header`.
pub fn sample_key(header: &SessionHeader, servicer: Address) -> EvidenceKey {
    EvidenceKey::new(header, EvidenceType::FishermanTest, servicer)
}
