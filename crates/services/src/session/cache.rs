// Path: crates/services/src/session/cache.rs
//! The process-wide session cache, keyed by header hash.

use super::build_session;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use viper_api::chain::ChainView;
use viper_api::staking::SessionCacheInvalidator;
use viper_api::state::StateAccess;
use viper_telemetry::sinks::relay_metrics;
use viper_types::app::{session_end_height, Hash32, Session, SessionHeader};
use viper_types::config::ViperParams;
use viper_types::error::ViperError;

#[derive(Debug, Clone)]
struct CachedSession {
    session: Arc<Session>,
    end_height: u64,
}

/// Assembled sessions shared by the relay handler, the dispatcher and the
/// claim keeper. Readers share the lock; a miss takes the writer lock and
/// builds at most once per header.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: RwLock<AHashMap<Hash32, CachedSession>>,
}

impl SessionCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cached session, if present.
    pub fn get(&self, header: &SessionHeader) -> Option<Arc<Session>> {
        self.entries
            .read()
            .get(&header.hash())
            .map(|entry| Arc::clone(&entry.session))
    }

    /// The cached session for `header`, building and caching it with `build`
    /// on a miss. Build failures are not cached.
    pub fn get_or_build<F>(
        &self,
        header: &SessionHeader,
        blocks_per_session: u64,
        build: F,
    ) -> Result<Arc<Session>, ViperError>
    where
        F: FnOnce() -> Result<Session, ViperError>,
    {
        let key = header.hash();
        if let Some(entry) = self.entries.read().get(&key) {
            relay_metrics().inc_session_cache(true);
            return Ok(Arc::clone(&entry.session));
        }

        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(&key) {
            relay_metrics().inc_session_cache(true);
            return Ok(Arc::clone(&entry.session));
        }
        relay_metrics().inc_session_cache(false);
        let session = Arc::new(build()?);
        entries.insert(
            key,
            CachedSession {
                session: Arc::clone(&session),
                end_height: session_end_height(header.session_block_height, blocks_per_session),
            },
        );
        Ok(session)
    }

    /// The session for `header`, assembled from the chain on a miss.
    pub fn session(
        &self,
        chain: &dyn ChainView,
        live: &dyn StateAccess,
        params: &ViperParams,
        header: &SessionHeader,
    ) -> Result<Arc<Session>, ViperError> {
        self.get_or_build(header, params.blocks_per_session, || {
            build_session(chain, live, params, header)
        })
    }

    /// Evicts sessions that ended more than `retention_blocks` before `height`.
    /// Returns the number evicted.
    pub fn prune(&self, height: u64, retention_blocks: u64) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.end_height.saturating_add(retention_blocks) >= height);
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(target: "session", evicted, height, "pruned session cache");
        }
        evicted
    }

    /// The number of cached sessions.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SessionCacheInvalidator for SessionCache {
    fn clear_sessions(&self) {
        let mut entries = self.entries.write();
        if !entries.is_empty() {
            tracing::debug!(target: "session", cleared = entries.len(), "cleared session cache");
        }
        entries.clear();
    }
}
