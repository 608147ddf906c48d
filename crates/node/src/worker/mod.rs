// Path: crates/node/src/worker/mod.rs
//! End-of-session work: claims for finished sessions, proofs for mature
//! claims.
//!
//! Once per session, at the block picked by
//! [`jittered_session_tick`](crate::schedule::jittered_session_tick), the
//! worker spawns a task that sleeps a random few seconds and then runs two
//! passes over the node's evidence:
//!
//! - **claim**: every relay or challenge set whose session is over and that
//!   is not yet claimed is sealed, its Merkle root computed, and a `MsgClaim`
//!   broadcast;
//! - **proof**: for every mature claim the leaf chosen by the reveal block is
//!   proven with a `MsgProof`, after which the evidence is deleted.
//!
//! Evidence that can no longer be claimed or proven is deleted. An
//! insufficient-fee broadcast failure ends the tick; the next session retries.

use crate::context::NodeContext;
use crate::schedule::{jittered_session_tick, start_delay, MAX_START_DELAY};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use viper_api::state::StateAccess;
use viper_api::transaction::{BroadcastError, TxBroadcaster};
use viper_services::claims::ClaimsKeeper;
use viper_state::merkle::validate_proof;
use viper_state::random::pseudorandom_index;
use viper_storage::{EvidenceInfo, EvidenceKey};
use viper_telemetry::worker_metrics;
use viper_types::app::{is_session_block, session_end_height, Claim, EvidenceType, Msg, MsgClaim, MsgProof};
use viper_types::error::ErrorCode;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Claims broadcast.
    pub claims: usize,
    /// Proofs broadcast.
    pub proofs: usize,
    /// Evidence sets deleted as unusable.
    pub discarded: usize,
}

/// Submits this node's claims and proofs.
pub struct SessionWorker {
    ctx: Arc<NodeContext>,
    claims: ClaimsKeeper,
    broadcaster: Arc<dyn TxBroadcaster>,
    boundary: watch::Sender<u64>,
    max_delay: Duration,
}

impl SessionWorker {
    /// A worker reading claims through `claims` and broadcasting through
    /// `broadcaster`.
    pub fn new(ctx: Arc<NodeContext>, claims: ClaimsKeeper, broadcaster: Arc<dyn TxBroadcaster>) -> Self {
        let (boundary, _) = watch::channel(0);
        Self {
            ctx,
            claims,
            broadcaster,
            boundary,
            max_delay: MAX_START_DELAY,
        }
    }

    /// Overrides the upper bound of the random start delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// The end-block hook. Cancels an unfinished tick of the previous session
    /// when `height` opens a new one, and spawns this session's tick when
    /// `height` is this node's turn.
    pub fn on_block(self: &Arc<Self>, height: u64) -> Option<tokio::task::JoinHandle<()>> {
        let bps = self.ctx.params.blocks_per_session;
        if is_session_block(height, bps) {
            self.boundary.send_replace(height);
        }
        if !jittered_session_tick(height, &self.ctx.address(), bps) {
            return None;
        }
        if !self.ctx.chain.is_synced() {
            tracing::debug!(target: "worker", height, "skipping tick while catching up");
            return None;
        }

        let worker = Arc::clone(self);
        let mut boundary = self.boundary.subscribe();
        let delay = start_delay(self.max_delay);
        Some(tokio::spawn(async move {
            let work = async {
                tokio::time::sleep(delay).await;
                worker.run_tick(height).await
            };
            tokio::select! {
                result = work => match result {
                    Ok(report) => tracing::info!(
                        target: "worker",
                        height,
                        claims = report.claims,
                        proofs = report.proofs,
                        discarded = report.discarded,
                        "session tick done"
                    ),
                    Err(e) => tracing::warn!(target: "worker", height, error = %e, "session tick aborted"),
                },
                _ = boundary.changed() => {
                    tracing::warn!(target: "worker", height, "session tick cancelled at the session boundary");
                }
            }
        }))
    }

    /// Runs both passes at `height`.
    pub async fn run_tick(&self, height: u64) -> Result<TickReport, BroadcastError> {
        let mut report = TickReport::default();
        let live = match self.ctx.live_state() {
            Ok(live) => live,
            Err(e) => {
                tracing::warn!(target: "worker", height, error = %e, "no state to work from");
                return Ok(report);
            }
        };
        self.claim_pass(live.as_ref(), height, &mut report).await?;
        self.proof_pass(live.as_ref(), height, &mut report).await?;
        Ok(report)
    }

    async fn claim_pass(
        &self,
        live: &dyn StateAccess,
        height: u64,
        report: &mut TickReport,
    ) -> Result<(), BroadcastError> {
        let me = self.ctx.address();
        let params = self.claims.params();
        let bps = params.blocks_per_session;
        let evidence: Vec<EvidenceInfo> = self
            .ctx
            .evidence
            .iter()
            .into_iter()
            .filter(|i| i.key.servicer == me && i.key.kind != EvidenceType::FishermanTest)
            .collect();

        for info in evidence {
            let header = &info.header;
            if height <= session_end_height(header.session_block_height, bps) {
                continue;
            }
            match self.claims.get_claim(live, &me, header, info.key.kind) {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(target: "worker", error = %e, "cannot read claim");
                    continue;
                }
            }
            if !params.supports_chain(&header.chain) {
                self.discard(&info.key, "unsupported_chain", report);
                continue;
            }
            let reveal = header
                .session_block_height
                .saturating_add(params.claim_submission_window.saturating_mul(bps));
            if height > reveal {
                self.discard(&info.key, "claim_window_closed", report);
                continue;
            }
            if info.num_proofs < params.minimum_proofs {
                self.discard(&info.key, "insufficient_proofs", report);
                continue;
            }

            let (root, total) = match self.ctx.evidence.seal_and_root(&info.key) {
                Ok(sealed) => sealed,
                Err(e) => {
                    tracing::warn!(target: "worker", error = %e, "cannot seal evidence");
                    self.discard(&info.key, "unsealable", report);
                    continue;
                }
            };
            let msg = Msg::Claim(MsgClaim {
                header: header.clone(),
                merkle_root: root,
                total_proofs: total,
                from_address: me,
                evidence_type: Some(info.key.kind),
                expiration_height: 0,
            });
            if self.broadcast(msg, "claim").await? {
                worker_metrics().inc_claims_submitted();
                report.claims += 1;
                tracing::info!(
                    target: "worker",
                    chain = %header.chain,
                    session = header.session_block_height,
                    total_proofs = total,
                    "claim submitted"
                );
            }
        }
        Ok(())
    }

    async fn proof_pass(
        &self,
        live: &dyn StateAccess,
        height: u64,
        report: &mut TickReport,
    ) -> Result<(), BroadcastError> {
        let me = self.ctx.address();
        let claims = match self.claims.get_mature_claims(live, &me, height) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(target: "worker", error = %e, "cannot list mature claims");
                return Ok(());
            }
        };
        for claim in claims {
            let key = EvidenceKey::new(&claim.header, claim.evidence_type, me);
            let Some(msg) = self.prepare_proof(&claim, &key, height, report) else {
                continue;
            };
            if self.broadcast(Msg::Proof(msg), "proof").await? {
                worker_metrics().inc_proofs_submitted();
                report.proofs += 1;
                tracing::info!(
                    target: "worker",
                    chain = %claim.header.chain,
                    session = claim.header.session_block_height,
                    "proof submitted"
                );
                if let Err(e) = self.ctx.evidence.delete(&key) {
                    tracing::error!(target: "worker", error = %e, "cannot delete proven evidence");
                }
            }
        }
        Ok(())
    }

    /// The proof for `claim`, or `None` when its evidence is missing or has
    /// been deleted as unusable.
    fn prepare_proof(
        &self,
        claim: &Claim,
        key: &EvidenceKey,
        height: u64,
        report: &mut TickReport,
    ) -> Option<MsgProof> {
        let params = self.claims.params();
        let bps = params.blocks_per_session;
        let Some(evidence) = self.ctx.evidence.get(key) else {
            tracing::debug!(target: "worker", chain = %claim.header.chain, "no local evidence for claim");
            return None;
        };

        let max_age = self.ctx.config.max_claim_age_for_proof_retry.saturating_mul(bps);
        if height > claim.header.session_block_height.saturating_add(max_age) {
            self.discard(key, "stale", report);
            return None;
        }
        if !evidence.is_sealed() {
            self.discard(key, "unsealed", report);
            return None;
        }
        if evidence.num_proofs() != claim.total_proofs {
            tracing::error!(
                target: "worker",
                local = evidence.num_proofs(),
                claimed = claim.total_proofs,
                "evidence does not match its claim"
            );
            self.discard(key, "count_mismatch", report);
            return None;
        }

        let reveal_height = claim.reveal_height(params.claim_submission_window, bps);
        let reveal_hash = self.ctx.chain.block_hash(reveal_height)?;
        let index = pseudorandom_index(claim.total_proofs, &claim.header, &reveal_hash);
        let (leaf, merkle_proof) = match self.ctx.evidence.merkle_proof(key, index) {
            Ok(proof) => proof,
            Err(e) => {
                tracing::warn!(target: "worker", index, error = %e, "cannot build merkle proof");
                self.discard(key, "unprovable", report);
                return None;
            }
        };
        if self.ctx.config.proof_prevalidation {
            if let Err(e) = validate_proof(&claim.merkle_root, &merkle_proof, claim.total_proofs) {
                tracing::error!(target: "worker", index, error = %e, "proof fails self-validation");
                self.discard(key, "prevalidation", report);
                return None;
            }
        }
        Some(MsgProof {
            merkle_proof,
            leaf,
            evidence_type: Some(claim.evidence_type),
        })
    }

    /// Broadcasts `msg`. `Ok(false)` on a failure worth retrying next tick;
    /// `Err` when the tick must stop.
    async fn broadcast(&self, msg: Msg, what: &'static str) -> Result<bool, BroadcastError> {
        match self.broadcaster.broadcast(msg).await {
            Ok(_) => Ok(true),
            Err(BroadcastError::InsufficientFee) => {
                worker_metrics().inc_broadcast_failures(BroadcastError::InsufficientFee.code());
                tracing::warn!(target: "worker", what, "insufficient fee funds; stopping this tick");
                Err(BroadcastError::InsufficientFee)
            }
            Err(e) => {
                worker_metrics().inc_broadcast_failures(e.code());
                tracing::warn!(target: "worker", what, error = %e, "broadcast failed");
                Ok(false)
            }
        }
    }

    fn discard(&self, key: &EvidenceKey, reason: &'static str, report: &mut TickReport) {
        worker_metrics().inc_evidence_discarded(reason);
        report.discarded += 1;
        tracing::info!(
            target: "worker",
            servicer = %key.servicer,
            header = %hex::encode(key.header_hash),
            reason,
            "deleting evidence"
        );
        if let Err(e) = self.ctx.evidence.delete(key) {
            tracing::error!(target: "worker", error = %e, "cannot delete evidence");
        }
    }
}
