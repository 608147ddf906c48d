// Path: crates/node/src/node.rs
//! Wiring one node together and driving it from the block stream.

use crate::client::{HttpServicerClient, ServicerClient};
use crate::context::NodeContext;
use crate::fisherman::{AcceptSigned, Fisherman, ReliabilityOracle, SamplePool};
use crate::forwarder::HttpForwarder;
use crate::hosted::{spawn_reloader, HostedChains, HostedGeoZones, HotReload};
use crate::relay::RelayHandler;
use crate::schedule::{jittered_session_tick, MAX_START_DELAY};
use crate::server;
use crate::worker::SessionWorker;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use viper_api::chain::ChainView;
use viper_api::forwarder::RelayForwarder;
use viper_api::transaction::TxBroadcaster;
use viper_crypto::key_store::load_or_generate;
use viper_services::claims::ClaimsKeeper;
use viper_services::session::SessionCache;
use viper_services::staking::ServicerKeeper;
use viper_storage::EvidenceStore;
use viper_types::app::Address;
use viper_types::config::{NodeConfig, StakingParams, ViperParams};

const RELOAD_INTERVAL: Duration = Duration::from_secs(10);
/// Added to the RPC timeout for the whole-request bound of the relay server.
const SERVER_TIMEOUT_MARGIN: Duration = Duration::from_secs(2);

/// The outbound edges of a node.
#[derive(Clone)]
pub struct NodeDeps {
    /// Where relays for hosted chains go.
    pub forwarder: Arc<dyn RelayForwarder>,
    /// Where claims, proofs and report cards go.
    pub broadcaster: Arc<dyn TxBroadcaster>,
    /// How fisherman samples reach other servicers.
    pub client: Arc<dyn ServicerClient>,
    /// How sampled answers are judged.
    pub oracle: Arc<dyn ReliabilityOracle>,
}

impl NodeDeps {
    /// HTTP forwarding and sampling around `broadcaster`.
    pub fn http(broadcaster: Arc<dyn TxBroadcaster>) -> Self {
        Self {
            forwarder: Arc::new(HttpForwarder::new()),
            broadcaster,
            client: Arc::new(HttpServicerClient::new()),
            oracle: Arc::new(AcceptSigned),
        }
    }
}

/// One servicer: relay handler, session worker and fisherman over a shared
/// [`NodeContext`].
pub struct Node {
    ctx: Arc<NodeContext>,
    relay: Arc<RelayHandler>,
    worker: Arc<SessionWorker>,
    fisherman: Arc<Fisherman>,
    shutdown: watch::Sender<bool>,
}

impl Node {
    /// Assembles a node from an already built context.
    pub fn new(ctx: NodeContext, pool: SamplePool, deps: NodeDeps) -> Self {
        Self::with_worker_delay(ctx, pool, deps, MAX_START_DELAY)
    }

    /// Like [`Node::new`], with the worker's random start delay bounded by
    /// `max_delay`.
    pub fn with_worker_delay(ctx: NodeContext, pool: SamplePool, deps: NodeDeps, max_delay: Duration) -> Self {
        let ctx = Arc::new(ctx);
        let claims = ClaimsKeeper::new(
            ctx.params.clone(),
            Arc::clone(&ctx.sessions),
            ServicerKeeper::new(StakingParams::servicer_default(), ctx.params.clone()),
        );
        let relay = Arc::new(RelayHandler::new(Arc::clone(&ctx), deps.forwarder));
        let worker = Arc::new(
            SessionWorker::new(Arc::clone(&ctx), claims, Arc::clone(&deps.broadcaster)).with_max_delay(max_delay),
        );
        let fisherman = Arc::new(Fisherman::new(
            Arc::clone(&ctx),
            deps.client,
            deps.broadcaster,
            pool,
            deps.oracle,
        ));
        let (shutdown, _) = watch::channel(false);
        Self {
            ctx,
            relay,
            worker,
            fisherman,
            shutdown,
        }
    }

    /// Opens a node from `config`: loads or creates its key, opens its
    /// evidence database and reads the optional chain, geo-zone and sample
    /// files under their configured paths.
    pub fn open(
        config: NodeConfig,
        params: ViperParams,
        chain: Arc<dyn ChainView>,
        sessions: Arc<SessionCache>,
        deps: NodeDeps,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;
        let key = load_or_generate(&config.key_file_path()).context("loading node key")?;
        let bloom_items = usize::try_from(config.bloom_expected_items).unwrap_or(usize::MAX);
        let evidence = EvidenceStore::open(config.evidence_db_path(), bloom_items).context("opening evidence store")?;
        let hosted = match &config.chains_path {
            Some(path) => HostedChains::load(path)?,
            None => HostedChains::new(Vec::new())?,
        };
        let geo_zones = match &config.geo_zones_path {
            Some(path) => HostedGeoZones::load(path)?,
            None => HostedGeoZones::new(Vec::new()),
        };
        let pool = match &config.sample_pool_path {
            Some(path) => SamplePool::load(path)?,
            None => SamplePool::default(),
        };

        let ctx = NodeContext {
            config,
            params,
            key,
            chain,
            sessions,
            evidence: Arc::new(evidence),
            hosted: Arc::new(hosted),
            geo_zones: Arc::new(geo_zones),
        };
        let node = Self::new(ctx, pool, deps);
        tracing::info!(
            target: "node",
            address = %node.address(),
            chains = ?node.ctx.hosted.ids(),
            "node opened"
        );
        Ok(node)
    }

    /// The shared context.
    pub fn ctx(&self) -> &Arc<NodeContext> {
        &self.ctx
    }

    /// The relay and dispatch handler.
    pub fn relay(&self) -> &Arc<RelayHandler> {
        &self.relay
    }

    /// The claim and proof worker.
    pub fn worker(&self) -> &Arc<SessionWorker> {
        &self.worker
    }

    /// The QoS sampler.
    pub fn fisherman(&self) -> &Arc<Fisherman> {
        &self.fisherman
    }

    /// This node's address.
    pub fn address(&self) -> Address {
        self.ctx.address()
    }

    /// The end-block hook: prunes old sessions, starts this session's
    /// claim/proof tick and, on the same jittered block, submits pending
    /// report cards.
    pub fn on_block(&self, height: u64) -> Vec<JoinHandle<()>> {
        self.ctx.sessions.prune(height, self.ctx.config.session_retention_blocks);
        let mut tasks = Vec::new();
        if let Some(task) = self.worker.on_block(height) {
            tasks.push(task);
        }
        let bps = self.ctx.params.blocks_per_session;
        if jittered_session_tick(height, &self.address(), bps) && self.ctx.chain.is_synced() {
            let fisherman = Arc::clone(&self.fisherman);
            tasks.push(tokio::spawn(async move {
                match fisherman.submit_reports(height).await {
                    Ok(0) => {}
                    Ok(sent) => tracing::info!(target: "fisherman", height, sent, "report cards submitted"),
                    Err(e) => tracing::warn!(target: "fisherman", height, error = %e, "report submission aborted"),
                }
            }));
        }
        tasks
    }

    /// Starts the background tasks: evidence flushing, fisherman sampling,
    /// hot reload of the hosted files and, when configured, the metrics
    /// endpoint.
    pub fn start(&self) -> anyhow::Result<Vec<JoinHandle<()>>> {
        let config = &self.ctx.config;
        let mut tasks = vec![
            Arc::clone(&self.ctx.evidence).spawn_flusher(
                Duration::from_secs(config.evidence_flush_interval_secs.max(1)),
                self.shutdown.subscribe(),
            ),
            Arc::clone(&self.fisherman).spawn_sampler(
                Duration::from_millis(config.fisherman_sample_interval_ms.max(1)),
                self.shutdown.subscribe(),
            ),
        ];
        let reloadable: Vec<Arc<dyn HotReload>> = vec![
            Arc::clone(&self.ctx.hosted) as Arc<dyn HotReload>,
            Arc::clone(&self.ctx.geo_zones) as Arc<dyn HotReload>,
        ];
        tasks.push(spawn_reloader(reloadable, RELOAD_INTERVAL, self.shutdown.subscribe()));

        if let Some(addr) = &config.prometheus_addr {
            let addr: SocketAddr = addr
                .parse()
                .with_context(|| format!("invalid prometheus address {}", addr))?;
            let sink = viper_telemetry::prometheus::install()?;
            // Set once per process; later nodes in lean mode share it.
            let _ = viper_telemetry::sinks::SINK.set(sink);
            let _ = viper_storage::metrics::SINK.set(sink.as_evidence());
            let mut shutdown = self.shutdown.subscribe();
            tasks.push(tokio::spawn(viper_telemetry::http::run_server(addr, async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })));
        }
        Ok(tasks)
    }

    /// Serves relays and dispatches on `addr` until [`Node::shutdown`].
    pub async fn serve(&self, addr: SocketAddr) -> anyhow::Result<()> {
        let timeout = self.ctx.config.rpc_timeout().saturating_add(SERVER_TIMEOUT_MARGIN);
        let mut shutdown = self.shutdown.subscribe();
        server::run_server(addr, Arc::clone(&self.relay), timeout, async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
    }

    /// Stops the background tasks and the server, then flushes evidence.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        match self.ctx.evidence.flush() {
            Ok(written) => tracing::info!(target: "node", written, "node stopped"),
            Err(e) => tracing::error!(target: "node", error = %e, "evidence flush on shutdown failed"),
        }
    }
}
