// Path: crates/services/src/router.rs
//! Routes ledger messages to their keepers.
//!
//! Every message is checked statelessly, then its signer is matched against the
//! transaction signer before the owning keeper runs. Failures are returned as a
//! [`TxResult`] and never abort the block.

use crate::claims::{ClaimsKeeper, ProofOutcome};
use crate::staking::{RequestorKeeper, ServicerKeeper};
use viper_api::ledger::Ledger;
use viper_api::lifecycle::OnEndBlock;
use viper_api::state::StateAccess;
use viper_api::transaction::TxContext;
use viper_telemetry::sinks::error_metrics;
use viper_types::app::Msg;
use viper_types::error::{ErrorCode, TransactionError, TxResult};

/// The three message handlers of the relay core.
#[derive(Clone)]
pub struct Router {
    requestors: RequestorKeeper,
    servicers: ServicerKeeper,
    claims: ClaimsKeeper,
}

impl Router {
    /// Creates a router over the given keepers.
    pub fn new(requestors: RequestorKeeper, servicers: ServicerKeeper, claims: ClaimsKeeper) -> Self {
        Self {
            requestors,
            servicers,
            claims,
        }
    }

    /// The requestor keeper.
    pub fn requestors(&self) -> &RequestorKeeper {
        &self.requestors
    }

    /// The servicer keeper.
    pub fn servicers(&self) -> &ServicerKeeper {
        &self.servicers
    }

    /// The claim/proof keeper.
    pub fn claims(&self) -> &ClaimsKeeper {
        &self.claims
    }

    /// Handles one message signed by `ctx.signer`.
    pub fn handle(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        ctx: &TxContext<'_>,
        msg: &Msg,
    ) -> TxResult {
        match self.try_handle(state, ledger, ctx, msg) {
            Ok(()) => TxResult::ok(msg.route()),
            Err(e) => {
                error_metrics().inc_error(e.codespace(), e.code());
                tracing::debug!(
                    target: "router",
                    msg = msg.type_name(),
                    signer = %ctx.signer,
                    height = ctx.block_height,
                    error = %e,
                    "message rejected"
                );
                TxResult::from(&e)
            }
        }
    }

    fn try_handle(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        ctx: &TxContext<'_>,
        msg: &Msg,
    ) -> Result<(), TransactionError> {
        msg.validate_basic()?;
        if !msg.signers().contains(&ctx.signer) {
            return Err(TransactionError::Unauthorized(ctx.signer.to_hex()));
        }

        match msg {
            Msg::StakeRequestor(m) => {
                self.requestors.stake(state, ledger, m)?;
            }
            Msg::BeginUnstakeRequestor(m) => {
                self.requestors.begin_unstake(state, &m.address, ctx.block_time)?;
            }
            Msg::UnjailRequestor(m) => {
                self.requestors.unjail(state, &m.address)?;
            }
            Msg::StakeServicer(m) => {
                self.servicers.stake(state, ledger, m)?;
            }
            Msg::BeginUnstakeServicer(m) => {
                self.servicers.begin_unstake(state, &m.address, ctx.block_time)?;
            }
            Msg::UnjailServicer(m) => {
                self.servicers.unjail(state, &m.address)?;
            }
            Msg::Claim(m) => {
                self.claims.set_claim(state, ctx, m)?;
            }
            Msg::Proof(m) => match self.claims.handle_proof(state, ledger, ctx, m)? {
                ProofOutcome::Rewarded { minted } => {
                    tracing::debug!(target: "router", minted, "relay proof settled");
                }
                ProofOutcome::Slashed { burned, reward } => {
                    tracing::debug!(target: "router", burned, reward, "challenge proof settled");
                }
            },
            Msg::SubmitReportCard(m) => {
                self.claims.set_report_card(state, ctx, m)?;
            }
        }
        Ok(())
    }

    /// Runs every keeper's end-block hook: matured unstakings of both actor
    /// kinds, then expired claims and report cards.
    pub fn end_block(
        &self,
        state: &mut dyn StateAccess,
        ledger: &mut dyn Ledger,
        ctx: &TxContext<'_>,
    ) -> Result<(), TransactionError> {
        let hooks: [&dyn OnEndBlock; 3] = [&self.requestors, &self.servicers, &self.claims];
        for hook in hooks {
            hook.on_end_block(state, ledger, ctx)?;
        }
        Ok(())
    }
}
