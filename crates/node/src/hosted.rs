// Path: crates/node/src/hosted.rs
//! The chains and geo zones this node serves.
//!
//! Both maps sit behind a mutex so an operator can edit the backing JSON file
//! while the node runs; [`spawn_reloader`] re-reads a file whenever its
//! modification time moves.

use crate::error::{read_json, NodeError};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use viper_api::forwarder::HostedChain;

/// Something that can be re-read from its backing file.
pub trait HotReload: Send + Sync {
    /// Re-reads the file if it changed. Returns whether anything was reloaded.
    fn reload(&self) -> Result<bool, NodeError>;
}

#[derive(Debug)]
struct FileSource {
    path: PathBuf,
    modified: Mutex<Option<SystemTime>>,
}

impl FileSource {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            modified: Mutex::new(modified_at(path)),
        }
    }

    /// Records and reports a new modification time.
    fn take_change(&self) -> bool {
        let now = modified_at(&self.path);
        let mut seen = self.modified.lock();
        if now.is_some() && now != *seen {
            *seen = now;
            true
        } else {
            false
        }
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn validate_chain(chain: &HostedChain) -> Result<(), NodeError> {
    if chain.id.is_empty() {
        return Err(NodeError::InvalidChain {
            id: String::new(),
            reason: "empty chain id".into(),
        });
    }
    reqwest::Url::parse(&chain.url).map_err(|e| NodeError::InvalidChain {
        id: chain.id.clone(),
        reason: format!("bad url {:?}: {}", chain.url, e),
    })?;
    Ok(())
}

fn index_chains(chains: Vec<HostedChain>) -> Result<HashMap<String, HostedChain>, NodeError> {
    let mut map = HashMap::with_capacity(chains.len());
    for chain in chains {
        validate_chain(&chain)?;
        if map.contains_key(&chain.id) {
            return Err(NodeError::InvalidChain {
                id: chain.id,
                reason: "listed twice".into(),
            });
        }
        map.insert(chain.id.clone(), chain);
    }
    Ok(map)
}

/// Chain id to endpoint. The file is a JSON array of
/// `{"id", "url", "basic_auth": {"username", "password"}}` objects.
#[derive(Debug, Default)]
pub struct HostedChains {
    chains: Mutex<HashMap<String, HostedChain>>,
    source: Option<FileSource>,
}

impl HostedChains {
    /// A fixed set with no backing file.
    pub fn new(chains: Vec<HostedChain>) -> Result<Self, NodeError> {
        Ok(Self {
            chains: Mutex::new(index_chains(chains)?),
            source: None,
        })
    }

    /// Loads the set from `path`.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let chains: Vec<HostedChain> = read_json(path)?;
        Ok(Self {
            chains: Mutex::new(index_chains(chains)?),
            source: Some(FileSource::new(path)),
        })
    }

    /// The endpoint of `id`.
    pub fn get(&self, id: &str) -> Option<HostedChain> {
        self.chains.lock().get(id).cloned()
    }

    /// Whether `id` is hosted.
    pub fn contains(&self, id: &str) -> bool {
        self.chains.lock().contains_key(id)
    }

    /// Hosted chain ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.chains.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Swaps in a new set atomically; the old set stays if `chains` is invalid.
    pub fn replace(&self, chains: Vec<HostedChain>) -> Result<(), NodeError> {
        let map = index_chains(chains)?;
        *self.chains.lock() = map;
        Ok(())
    }
}

impl HotReload for HostedChains {
    fn reload(&self) -> Result<bool, NodeError> {
        let Some(source) = &self.source else {
            return Ok(false);
        };
        if !source.take_change() {
            return Ok(false);
        }
        let chains: Vec<HostedChain> = read_json(&source.path)?;
        self.replace(chains)?;
        tracing::info!(target: "relay", path = %source.path.display(), chains = ?self.ids(), "reloaded hosted chains");
        Ok(true)
    }
}

/// The geo zones this node advertises. The file is a JSON array of zone names.
#[derive(Debug, Default)]
pub struct HostedGeoZones {
    zones: Mutex<BTreeSet<String>>,
    source: Option<FileSource>,
}

impl HostedGeoZones {
    /// A fixed set with no backing file.
    pub fn new(zones: impl IntoIterator<Item = String>) -> Self {
        Self {
            zones: Mutex::new(zones.into_iter().collect()),
            source: None,
        }
    }

    /// Loads the set from `path`.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let zones: Vec<String> = read_json(path)?;
        Ok(Self {
            zones: Mutex::new(zones.into_iter().collect()),
            source: Some(FileSource::new(path)),
        })
    }

    /// Whether `zone` is served.
    pub fn contains(&self, zone: &str) -> bool {
        self.zones.lock().contains(zone)
    }

    /// The zones, sorted.
    pub fn zones(&self) -> Vec<String> {
        self.zones.lock().iter().cloned().collect()
    }
}

impl HotReload for HostedGeoZones {
    fn reload(&self) -> Result<bool, NodeError> {
        let Some(source) = &self.source else {
            return Ok(false);
        };
        if !source.take_change() {
            return Ok(false);
        }
        let zones: Vec<String> = read_json(&source.path)?;
        *self.zones.lock() = zones.into_iter().collect();
        tracing::info!(target: "relay", path = %source.path.display(), "reloaded hosted geo zones");
        Ok(true)
    }
}

/// Polls `targets` every `interval` until `shutdown` flips. A file that fails
/// to parse leaves the previous contents in place.
pub fn spawn_reloader(
    targets: Vec<Arc<dyn HotReload>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for target in &targets {
                        if let Err(e) = target.reload() {
                            tracing::warn!(target: "relay", error = %e, "hot reload failed; keeping previous contents");
                        }
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
