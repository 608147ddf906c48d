// Path: crates/node/tests/common/mod.rs
//! A small network in one process: a ledger behind the keepers, a scripted
//! chain, and one node per staked servicer, all wired together in memory.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use viper_api::forwarder::HostedChain;
use viper_api::ledger::Ledger;
use viper_api::transaction::TxContext;
use viper_crypto::sign::eddsa::Ed25519KeyPair;
use viper_node::client::ServicerClient;
use viper_node::fisherman::{AcceptSigned, SamplePool};
use viper_node::hosted::{HostedChains, HostedGeoZones};
use viper_node::relay::RelayHandler;
use viper_node::{Node, NodeContext, NodeDeps};
use viper_services::claims::ClaimsKeeper;
use viper_services::router::Router;
use viper_services::session::SessionCache;
use viper_services::staking::{RequestorKeeper, ServicerKeeper};
use viper_state::memory::MemoryState;
use viper_storage::EvidenceStore;
use viper_test_utils::keys::{aat_for, keypair, payload, signed_relay};
use viper_test_utils::{MemoryLedger, MockBroadcaster, MockChain, MockForwarder};
use viper_types::app::{
    Aat, Address, Msg, MsgStakeRequestor, MsgStakeServicer, Relay, RelayResponse, Session, SessionHeader,
};
use viper_types::config::{NodeConfig, StakingParams, ViperParams};
use viper_types::error::{TxResult, ViperError};

pub const CHAIN: &str = "0001";
pub const REQUESTOR_SEED: u8 = 1;
pub const CLIENT_SEED: u8 = 2;
pub const FIRST_SERVICER_SEED: u8 = 10;
pub const SERVICER_STAKE: u64 = 10_000_000;
pub const REQUESTOR_STAKE: u64 = 100_000_000;
pub const RESPONSE: &str = r#"{"jsonrpc":"2.0","id":1,"result":"0x10"}"#;

pub fn service_url(seed: u8) -> String {
    format!("https://servicer-{}.example", seed)
}

/// Delivers relays straight to in-process nodes, looked up by service URL.
#[derive(Default)]
pub struct LoopbackClient {
    handlers: RwLock<HashMap<String, Arc<RelayHandler>>>,
}

impl LoopbackClient {
    pub fn register(&self, url: String, handler: Arc<RelayHandler>) {
        self.handlers.write().insert(url, handler);
    }

    pub fn unregister(&self, url: &str) {
        self.handlers.write().remove(url);
    }
}

#[async_trait]
impl ServicerClient for LoopbackClient {
    async fn send_relay(
        &self,
        service_url: &str,
        relay: &Relay,
        _timeout: Duration,
    ) -> Result<RelayResponse, ViperError> {
        let handler = self
            .handlers
            .read()
            .get(service_url)
            .cloned()
            .ok_or_else(|| ViperError::UpstreamError(format!("connection refused: {}", service_url)))?;
        handler.handle_relay(relay.clone()).await
    }
}

pub fn servicer_staking_params() -> StakingParams {
    StakingParams {
        minimum_stake: 1_000_000,
        ..StakingParams::servicer_default()
    }
}

pub struct World {
    pub params: ViperParams,
    pub chain: Arc<MockChain>,
    pub state: MemoryState,
    pub ledger: MemoryLedger,
    pub sessions: Arc<SessionCache>,
    pub router: Router,
    pub broadcaster: Arc<MockBroadcaster>,
    pub forwarder: Arc<MockForwarder>,
    pub client: Arc<LoopbackClient>,
    pub nodes: Vec<Node>,
    pub requestor: Ed25519KeyPair,
    pub client_key: Ed25519KeyPair,
    /// Every message applied so far with its outcome.
    pub results: Vec<(Msg, TxResult)>,
    pub pool: SamplePool,
    height: u64,
}

impl World {
    /// Default parameters, five servicers and a requestor staked 10^8.
    pub fn standard() -> Self {
        Self::new(ViperParams::default(), 5, REQUESTOR_STAKE)
    }

    pub fn new(params: ViperParams, servicers: u8, requestor_stake: u64) -> Self {
        let mut pool = HashMap::new();
        pool.insert(CHAIN.to_string(), vec![payload(r#"{"method":"eth_blockNumber"}"#)]);
        Self::with_pool(params, servicers, requestor_stake, SamplePool::new(pool))
    }

    /// Stakes everyone at genesis and opens the first session at height 1.
    pub fn with_pool(params: ViperParams, servicers: u8, requestor_stake: u64, pool: SamplePool) -> Self {
        let sessions = Arc::new(SessionCache::new());
        let servicer_keeper = ServicerKeeper::new(servicer_staking_params(), params.clone());
        let router = Router::new(
            RequestorKeeper::new(StakingParams::requestor_default(), params.clone(), sessions.clone()),
            servicer_keeper.clone(),
            ClaimsKeeper::new(params.clone(), sessions.clone(), servicer_keeper),
        );
        let forwarder = Arc::new(MockForwarder::new());
        forwarder.respond(CHAIN, RESPONSE);

        let mut world = Self {
            params,
            chain: Arc::new(MockChain::new()),
            state: MemoryState::new(),
            ledger: MemoryLedger::new(),
            sessions,
            router,
            broadcaster: Arc::new(MockBroadcaster::new()),
            forwarder,
            client: Arc::new(LoopbackClient::default()),
            nodes: Vec::new(),
            requestor: keypair(REQUESTOR_SEED),
            client_key: keypair(CLIENT_SEED),
            results: Vec::new(),
            pool,
            height: 0,
        };
        for i in 0..servicers {
            world.add_servicer(FIRST_SERVICER_SEED + i);
        }
        world.stake_requestor(requestor_stake);
        world.chain.commit(1, &world.state);
        world.height = 1;
        world
    }

    /// Stakes the servicer with key `seed` and starts a node for it.
    pub fn add_servicer(&mut self, seed: u8) -> usize {
        let key = keypair(seed);
        self.ledger.fund(&key.address(), SERVICER_STAKE);
        let msg = MsgStakeServicer {
            public_key: key.viper_public_key(),
            chains: vec![CHAIN.into()],
            geo_zones: vec![],
            service_url: service_url(seed),
            amount: SERVICER_STAKE,
        };
        if let Err(e) = self.router.servicers().stake(&mut self.state, &mut self.ledger, &msg) {
            panic!("staking servicer {}: {}", seed, e);
        }
        let node = self.node_for(key);
        self.client.register(service_url(seed), Arc::clone(node.relay()));
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn node_for(&self, key: Ed25519KeyPair) -> Node {
        let hosted = match HostedChains::new(vec![HostedChain {
            id: CHAIN.into(),
            url: "http://127.0.0.1:8545".into(),
            basic_auth: None,
        }]) {
            Ok(h) => h,
            Err(e) => panic!("hosted chains: {}", e),
        };
        let ctx = NodeContext {
            config: NodeConfig::default(),
            params: self.params.clone(),
            key,
            chain: self.chain.clone(),
            sessions: self.sessions.clone(),
            evidence: Arc::new(EvidenceStore::in_memory(1_000)),
            hosted: Arc::new(hosted),
            geo_zones: Arc::new(HostedGeoZones::new(Vec::<String>::new())),
        };
        let deps = NodeDeps {
            forwarder: self.forwarder.clone(),
            broadcaster: self.broadcaster.clone(),
            client: self.client.clone(),
            oracle: Arc::new(AcceptSigned),
        };
        Node::with_worker_delay(ctx, self.pool.clone(), deps, Duration::ZERO)
    }

    pub fn stake_requestor(&mut self, amount: u64) {
        let key = self.requestor.clone();
        let balance = self.ledger.balance(&key.address());
        if balance < amount {
            self.ledger.fund(&key.address(), amount - balance);
        }
        let msg = MsgStakeRequestor {
            public_key: key.viper_public_key(),
            chains: vec![CHAIN.into()],
            geo_zones: vec![],
            amount,
            num_servicers: None,
        };
        if let Err(e) = self.router.requestors().stake(&mut self.state, &mut self.ledger, &msg) {
            panic!("staking requestor: {}", e);
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// The header of the session that opened at `start`.
    pub fn header(&self, start: u64) -> SessionHeader {
        SessionHeader::new(self.requestor.viper_public_key(), CHAIN, start)
    }

    pub fn session(&self, start: u64) -> Arc<Session> {
        match self
            .sessions
            .session(self.chain.as_ref(), &self.state, &self.params, &self.header(start))
        {
            Ok(s) => s,
            Err(e) => panic!("session at {}: {}", start, e),
        }
    }

    /// The node at `address`.
    pub fn node(&self, address: &Address) -> &Node {
        match self.nodes.iter().find(|n| n.address() == *address) {
            Some(n) => n,
            None => panic!("no node for {}", address),
        }
    }

    /// The node serving first in the session opened at `start`.
    pub fn first_servicer(&self, start: u64) -> &Node {
        let session = self.session(start);
        self.node(&session.servicers[0])
    }

    pub fn aat(&self) -> Aat {
        match aat_for(&self.requestor, &self.client_key) {
            Ok(aat) => aat,
            Err(e) => panic!("aat: {}", e),
        }
    }

    /// A client relay to `node` for the session opened at `start`.
    pub fn relay(&self, node: &Node, start: u64, entropy: u64) -> Relay {
        match signed_relay(
            &self.client_key,
            &self.aat(),
            &self.header(start),
            &node.ctx().key,
            entropy,
            self.height,
            r#"{"method":"eth_blockNumber"}"#,
        ) {
            Ok(r) => r,
            Err(e) => panic!("relay: {}", e),
        }
    }

    /// Applies the broadcast backlog as the transactions of block `height`.
    fn deliver(&mut self, height: u64) {
        for msg in self.broadcaster.take() {
            let signer = msg.signers().first().copied().unwrap_or_default();
            let ctx = TxContext {
                block_height: height,
                block_time: MockChain::time_at(height),
                signer,
                chain: self.chain.as_ref(),
            };
            let result = self.router.handle(&mut self.state, &mut self.ledger, &ctx, &msg);
            self.results.push((msg, result));
        }
    }

    fn produce_block(&mut self) -> u64 {
        let height = self.height + 1;
        self.chain.commit(height, &self.state);
        self.deliver(height);
        let ctx = TxContext {
            block_height: height,
            block_time: MockChain::time_at(height),
            signer: Address::default(),
            chain: self.chain.as_ref(),
        };
        if let Err(e) = self.router.end_block(&mut self.state, &mut self.ledger, &ctx) {
            panic!("end block {}: {}", height, e);
        }
        self.chain.commit(height, &self.state);
        self.height = height;
        height
    }

    /// Produces blocks up to `height` without running the node hooks.
    pub fn commit_to(&mut self, height: u64) {
        while self.height < height {
            self.produce_block();
        }
    }

    /// Produces blocks up to `height`, running every node's end-block hook
    /// and waiting for the work it spawns.
    pub async fn advance_to(&mut self, height: u64) {
        while self.height < height {
            let h = self.produce_block();
            let tasks: Vec<_> = self.nodes.iter().flat_map(|n| n.on_block(h)).collect();
            for task in tasks {
                if let Err(e) = task.await {
                    panic!("node task at {}: {}", h, e);
                }
            }
        }
    }

    /// Outcomes of applied messages matching `pick`.
    pub fn outcomes<F: Fn(&Msg) -> bool>(&self, pick: F) -> Vec<&TxResult> {
        self.results
            .iter()
            .filter(|(m, _)| pick(m))
            .map(|(_, r)| r)
            .collect()
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.ledger.balance(address)
    }
}

pub fn is_claim(msg: &Msg) -> bool {
    matches!(msg, Msg::Claim(_))
}

pub fn is_proof(msg: &Msg) -> bool {
    matches!(msg, Msg::Proof(_))
}

pub fn is_report(msg: &Msg) -> bool {
    matches!(msg, Msg::SubmitReportCard(_))
}
