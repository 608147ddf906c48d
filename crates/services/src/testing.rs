// Path: crates/services/src/testing.rs
//! Shared fixtures for the keeper unit tests.

use crate::session::SessionCache;
use crate::staking::{RequestorKeeper, ServicerKeeper};
use std::sync::Arc;
use viper_crypto::sign::eddsa::Ed25519KeyPair;
use viper_state::memory::MemoryState;
use viper_test_utils::keys::keypair;
use viper_test_utils::MemoryLedger;
use viper_types::app::{Address, MsgStakeRequestor, MsgStakeServicer};
use viper_types::config::{StakingParams, ViperParams};

pub const CHAIN: &str = "0001";
pub const REQUESTOR_SEED: u8 = 1;
pub const CLIENT_SEED: u8 = 2;
pub const FIRST_SERVICER_SEED: u8 = 10;
pub const SERVICER_STAKE: u64 = 10_000_000;

pub fn servicer_params() -> StakingParams {
    StakingParams {
        minimum_stake: 1_000_000,
        ..StakingParams::servicer_default()
    }
}

pub struct Fixture {
    pub state: MemoryState,
    pub ledger: MemoryLedger,
    pub params: ViperParams,
    pub sessions: Arc<SessionCache>,
    pub servicers: ServicerKeeper,
    pub requestors: RequestorKeeper,
}

impl Fixture {
    pub fn new(params: ViperParams) -> Self {
        let sessions = Arc::new(SessionCache::new());
        Self {
            state: MemoryState::new(),
            ledger: MemoryLedger::new(),
            servicers: ServicerKeeper::new(servicer_params(), params.clone()),
            requestors: RequestorKeeper::new(
                StakingParams::requestor_default(),
                params.clone(),
                sessions.clone(),
            ),
            sessions,
            params,
        }
    }

    /// Stakes servicers with seeds `FIRST_SERVICER_SEED..+n` on `CHAIN`.
    pub fn with_servicers(mut self, n: u8) -> Self {
        for i in 0..n {
            self.stake_servicer(FIRST_SERVICER_SEED + i, &[]);
        }
        self
    }

    pub fn stake_servicer(&mut self, seed: u8, zones: &[&str]) -> Address {
        let key = keypair(seed);
        self.ledger.fund(&key.address(), SERVICER_STAKE);
        let msg = MsgStakeServicer {
            public_key: key.viper_public_key(),
            chains: vec![CHAIN.into()],
            geo_zones: zones.iter().map(|z| z.to_string()).collect(),
            service_url: format!("https://servicer-{}.example", seed),
            amount: SERVICER_STAKE,
        };
        match self.servicers.stake(&mut self.state, &mut self.ledger, &msg) {
            Ok(s) => s.address,
            Err(e) => panic!("staking servicer {}: {}", seed, e),
        }
    }

    pub fn stake_requestor(&mut self, amount: u64, num_servicers: Option<u64>) -> Ed25519KeyPair {
        let key = keypair(REQUESTOR_SEED);
        self.ledger.fund(&key.address(), amount);
        let msg = MsgStakeRequestor {
            public_key: key.viper_public_key(),
            chains: vec![CHAIN.into()],
            geo_zones: vec![],
            amount,
            num_servicers,
        };
        if let Err(e) = self.requestors.stake(&mut self.state, &mut self.ledger, &msg) {
            panic!("staking requestor: {}", e);
        }
        key
    }

    pub fn servicer_key(index: u8) -> Ed25519KeyPair {
        keypair(FIRST_SERVICER_SEED + index)
    }
}
