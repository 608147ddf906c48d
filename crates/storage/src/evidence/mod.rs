// Path: crates/storage/src/evidence/mod.rs
//! The evidence store.
//!
//! Entries live in a `DashMap` of `parking_lot::Mutex`es so parallel relay
//! handlers only contend on the set they append to. Persistence is a single
//! redb table, `EVIDENCE: sha256(header) || kind || servicer -> SCALE(record)`,
//! written by `flush` and read back in full by `open`.

use crate::bloom::BloomFilter;
use crate::metrics::metrics;
use dashmap::DashMap;
use parity_scale_codec::{Decode, Encode};
use parking_lot::Mutex;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use viper_state::merkle;
use viper_types::app::{
    Address, EvidenceType, Hash32, HashRange, MerkleProof, Proof, SessionHeader,
};
use viper_types::codec;
use viper_types::error::{StateError, ViperError};

const EVIDENCE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("EVIDENCE");

fn kind_label(kind: EvidenceType) -> &'static str {
    match kind {
        EvidenceType::Relay => "relay",
        EvidenceType::Challenge => "challenge",
        EvidenceType::FishermanTest => "fisherman_test",
    }
}

fn backend<E: std::fmt::Display>(e: E) -> StateError {
    StateError::Backend(e.to_string())
}

/// Identifies one evidence set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvidenceKey {
    /// `SessionHeader::hash()` of the session.
    pub header_hash: Hash32,
    /// The evidence kind.
    pub kind: EvidenceType,
    /// The servicer the evidence is about.
    pub servicer: Address,
}

impl EvidenceKey {
    /// The key of `servicer`'s `kind` evidence for `header`.
    pub fn new(header: &SessionHeader, kind: EvidenceType, servicer: Address) -> Self {
        Self {
            header_hash: header.hash(),
            kind,
            servicer,
        }
    }

    /// `header_hash || kind || servicer`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(32 + 1 + 20);
        key.extend_from_slice(&self.header_hash);
        key.push(self.kind.as_byte());
        key.extend_from_slice(&self.servicer.0);
        key
    }
}

/// The persisted form of an evidence set.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
struct EvidenceRecord {
    header: SessionHeader,
    kind: EvidenceType,
    servicer: Address,
    proofs: Vec<Proof>,
    bloom: BloomFilter,
    sealed: bool,
}

/// One accumulator of proofs.
#[derive(Debug, Clone)]
pub struct Evidence {
    header: SessionHeader,
    kind: EvidenceType,
    servicer: Address,
    proofs: Vec<Proof>,
    bloom: BloomFilter,
    sealed: bool,
    version: u64,
    flushed_version: u64,
}

impl Evidence {
    fn new(header: SessionHeader, kind: EvidenceType, servicer: Address, bloom_items: usize) -> Self {
        Self {
            header,
            kind,
            servicer,
            proofs: Vec::new(),
            bloom: BloomFilter::new(bloom_items),
            sealed: false,
            version: 1,
            flushed_version: 0,
        }
    }

    fn from_record(record: EvidenceRecord) -> Self {
        Self {
            header: record.header,
            kind: record.kind,
            servicer: record.servicer,
            proofs: record.proofs,
            bloom: record.bloom,
            sealed: record.sealed,
            version: 0,
            flushed_version: 0,
        }
    }

    fn to_record(&self) -> EvidenceRecord {
        EvidenceRecord {
            header: self.header.clone(),
            kind: self.kind,
            servicer: self.servicer,
            proofs: self.proofs.clone(),
            bloom: self.bloom.clone(),
            sealed: self.sealed,
        }
    }

    /// The session the evidence belongs to.
    pub fn header(&self) -> &SessionHeader {
        &self.header
    }

    /// The number of proofs appended.
    pub fn num_proofs(&self) -> u64 {
        self.proofs.len() as u64
    }

    /// Whether the set has been sealed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// The proofs, in append order.
    pub fn proofs(&self) -> &[Proof] {
        &self.proofs
    }

    /// Appends `proof` unless the set is sealed or already holds a proof with
    /// the same uniqueness key.
    pub fn append(&mut self, proof: Proof) -> Result<u64, ViperError> {
        if self.sealed {
            return Err(ViperError::EvidenceSealed);
        }
        let unique = proof.uniqueness_key();
        if self.bloom.may_contain(&unique) {
            if self.proofs.iter().any(|p| p.uniqueness_key() == unique) {
                metrics().inc_duplicates_rejected(kind_label(self.kind));
                return Err(ViperError::DuplicateProof);
            }
            metrics().inc_bloom_false_positives();
        }
        self.bloom.insert(&unique);
        self.proofs.push(proof);
        self.version += 1;
        metrics().inc_proofs_appended(kind_label(self.kind));
        Ok(self.num_proofs())
    }

    /// Freezes the set. Idempotent.
    pub fn seal(&mut self) {
        if !self.sealed {
            self.sealed = true;
            self.version += 1;
        }
    }

    /// Seals the set and returns its Merkle root.
    pub fn seal_and_root(&mut self) -> Result<HashRange, ViperError> {
        self.seal();
        Ok(merkle::generate_root(&self.proofs)?)
    }

    /// The proof at `index`.
    pub fn proof_at(&self, index: u64) -> Option<&Proof> {
        usize::try_from(index).ok().and_then(|i| self.proofs.get(i))
    }

    /// The leaf at `index` and its membership proof. The set must be sealed.
    pub fn merkle_proof(&self, index: u64) -> Result<(Proof, MerkleProof), ViperError> {
        if !self.sealed {
            return Err(ViperError::EvidenceNotSealed);
        }
        let leaf = self
            .proof_at(index)
            .cloned()
            .ok_or_else(|| ViperError::InvalidEvidence(format!("no proof at index {}", index)))?;
        let proof = merkle::generate_proof(&self.proofs, index)?;
        Ok((leaf, proof))
    }
}

/// A point-in-time summary of one evidence set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceInfo {
    /// The set's key.
    pub key: EvidenceKey,
    /// The session the evidence belongs to.
    pub header: SessionHeader,
    /// The number of proofs.
    pub num_proofs: u64,
    /// Whether the set is sealed.
    pub sealed: bool,
}

/// The per-node evidence store.
pub struct EvidenceStore {
    entries: DashMap<EvidenceKey, Arc<Mutex<Evidence>>>,
    db: Option<Arc<Database>>,
    // Serializes disk writes so a delete cannot be undone by a concurrent flush.
    io: Mutex<()>,
    bloom_items: usize,
}

impl std::fmt::Debug for EvidenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceStore")
            .field("entries", &self.entries.len())
            .field("persistent", &self.db.is_some())
            .finish()
    }
}

impl EvidenceStore {
    /// A store that never touches disk.
    pub fn in_memory(bloom_items: usize) -> Self {
        Self {
            entries: DashMap::new(),
            db: None,
            io: Mutex::new(()),
            bloom_items,
        }
    }

    /// Opens (or creates) the database at `path` and rebuilds the cache from it.
    pub fn open(path: impl AsRef<Path>, bloom_items: usize) -> Result<Self, StateError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(backend)?;
        }
        let db = Database::create(path).map_err(backend)?;
        {
            let w = db.begin_write().map_err(backend)?;
            w.open_table(EVIDENCE).map_err(backend)?;
            w.commit().map_err(backend)?;
        }

        let entries = DashMap::new();
        {
            let r = db.begin_read().map_err(backend)?;
            let table = r.open_table(EVIDENCE).map_err(backend)?;
            for row in table.iter().map_err(backend)? {
                let (_, value) = row.map_err(backend)?;
                let record: EvidenceRecord =
                    codec::from_bytes_canonical(value.value()).map_err(StateError::Decode)?;
                let evidence = Evidence::from_record(record);
                let key = EvidenceKey::new(&evidence.header, evidence.kind, evidence.servicer);
                entries.insert(key, Arc::new(Mutex::new(evidence)));
            }
        }
        tracing::info!(
            target: "evidence",
            path = %path.display(),
            entries = entries.len(),
            "evidence store opened"
        );
        metrics().set_open_evidence(entries.len() as u64);

        Ok(Self {
            entries,
            db: Some(Arc::new(db)),
            io: Mutex::new(()),
            bloom_items,
        })
    }

    fn entry(&self, key: &EvidenceKey) -> Option<Arc<Mutex<Evidence>>> {
        self.entries.get(key).map(|e| Arc::clone(e.value()))
    }

    fn entry_or_create(&self, header: &SessionHeader, key: EvidenceKey) -> Arc<Mutex<Evidence>> {
        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Mutex::new(Evidence::new(
                    header.clone(),
                    key.kind,
                    key.servicer,
                    self.bloom_items,
                )))
            })
            .value()
            .clone();
        metrics().set_open_evidence(self.entries.len() as u64);
        entry
    }

    /// Appends `proof` to `servicer`'s evidence of the proof's kind for `header`.
    /// Returns the new proof count.
    pub fn append(
        &self,
        header: &SessionHeader,
        servicer: Address,
        proof: Proof,
    ) -> Result<u64, ViperError> {
        self.append_bounded(header, servicer, proof, None)
    }

    /// Like `append`, but fails with `QuotaExceeded` once the set holds `max` proofs.
    /// The count check and the append happen under the same lock.
    pub fn append_bounded(
        &self,
        header: &SessionHeader,
        servicer: Address,
        proof: Proof,
        max: Option<u64>,
    ) -> Result<u64, ViperError> {
        let key = EvidenceKey::new(header, proof.evidence_type(), servicer);
        let entry = self.entry_or_create(header, key);
        let mut evidence = entry.lock();
        if let Some(max) = max {
            if evidence.num_proofs() >= max {
                return Err(ViperError::QuotaExceeded { max });
            }
        }
        evidence.append(proof)
    }

    /// The number of proofs in a set; zero when absent.
    pub fn count(&self, key: &EvidenceKey) -> u64 {
        self.entry(key).map_or(0, |e| e.lock().num_proofs())
    }

    /// Whether a set exists.
    pub fn contains(&self, key: &EvidenceKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Seals a set. Idempotent.
    pub fn seal(&self, key: &EvidenceKey) -> Result<(), ViperError> {
        let entry = self.entry(key).ok_or_else(|| missing(key))?;
        entry.lock().seal();
        Ok(())
    }

    /// Seals a set and computes its root under one lock acquisition.
    /// Returns the root and the sealed proof count.
    pub fn seal_and_root(&self, key: &EvidenceKey) -> Result<(HashRange, u64), ViperError> {
        let entry = self.entry(key).ok_or_else(|| missing(key))?;
        let mut evidence = entry.lock();
        let root = evidence.seal_and_root()?;
        Ok((root, evidence.num_proofs()))
    }

    /// The proof at `index`.
    pub fn proof_at(&self, key: &EvidenceKey, index: u64) -> Result<Proof, ViperError> {
        let entry = self.entry(key).ok_or_else(|| missing(key))?;
        let evidence = entry.lock();
        evidence
            .proof_at(index)
            .cloned()
            .ok_or_else(|| ViperError::InvalidEvidence(format!("no proof at index {}", index)))
    }

    /// The leaf at `index` and its membership proof from a sealed set.
    pub fn merkle_proof(&self, key: &EvidenceKey, index: u64) -> Result<(Proof, MerkleProof), ViperError> {
        let entry = self.entry(key).ok_or_else(|| missing(key))?;
        let evidence = entry.lock();
        evidence.merkle_proof(index)
    }

    /// A copy of one set.
    pub fn get(&self, key: &EvidenceKey) -> Option<Evidence> {
        self.entry(key).map(|e| e.lock().clone())
    }

    /// The proofs of one set in append order.
    pub fn proofs(&self, key: &EvidenceKey) -> Vec<Proof> {
        self.entry(key)
            .map(|e| e.lock().proofs().to_vec())
            .unwrap_or_default()
    }

    /// Summaries of every set.
    pub fn iter(&self) -> Vec<EvidenceInfo> {
        let entries: Vec<(EvidenceKey, Arc<Mutex<Evidence>>)> = self
            .entries
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect();
        entries
            .into_iter()
            .map(|(key, entry)| {
                let evidence = entry.lock();
                EvidenceInfo {
                    key,
                    header: evidence.header.clone(),
                    num_proofs: evidence.num_proofs(),
                    sealed: evidence.sealed,
                }
            })
            .collect()
    }

    /// Removes a set from memory and disk.
    pub fn delete(&self, key: &EvidenceKey) -> Result<(), StateError> {
        let _io = self.io.lock();
        self.entries.remove(key);
        metrics().set_open_evidence(self.entries.len() as u64);
        if let Some(db) = &self.db {
            let w = db.begin_write().map_err(backend)?;
            {
                let mut table = w.open_table(EVIDENCE).map_err(backend)?;
                table.remove(key.to_bytes().as_slice()).map_err(backend)?;
            }
            w.commit().map_err(backend)?;
        }
        tracing::debug!(
            target: "evidence",
            servicer = %key.servicer,
            header = %hex::encode(key.header_hash),
            kind = kind_label(key.kind),
            "evidence deleted"
        );
        Ok(())
    }

    /// Writes every set changed since the last flush. Returns the number written.
    pub fn flush(&self) -> Result<u64, StateError> {
        let Some(db) = &self.db else {
            return Ok(0);
        };
        let _io = self.io.lock();
        let mut pending = Vec::new();
        for item in self.entries.iter() {
            let evidence = item.value().lock();
            if evidence.version != evidence.flushed_version {
                let bytes = codec::to_bytes_canonical(&evidence.to_record())
                    .map_err(StateError::InvalidValue)?;
                pending.push((*item.key(), Arc::clone(item.value()), evidence.version, bytes));
            }
        }
        if pending.is_empty() {
            return Ok(0);
        }

        let w = db.begin_write().map_err(backend)?;
        {
            let mut table = w.open_table(EVIDENCE).map_err(backend)?;
            for (key, _, _, bytes) in &pending {
                table
                    .insert(key.to_bytes().as_slice(), bytes.as_slice())
                    .map_err(backend)?;
            }
        }
        w.commit().map_err(backend)?;

        for (_, entry, version, _) in &pending {
            let mut evidence = entry.lock();
            evidence.flushed_version = evidence.flushed_version.max(*version);
        }
        let written = pending.len() as u64;
        metrics().inc_records_flushed(written);
        tracing::debug!(target: "evidence", written, "evidence flushed");
        Ok(written)
    }

    /// Flushes every `interval` until `shutdown` flips, then flushes once more.
    pub fn spawn_flusher(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.flush() {
                            tracing::error!(target: "evidence", error = %e, "periodic evidence flush failed");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            if let Err(e) = self.flush() {
                tracing::error!(target: "evidence", error = %e, "final evidence flush failed");
            }
        })
    }
}

fn missing(key: &EvidenceKey) -> ViperError {
    ViperError::InvalidEvidence(format!(
        "no {} evidence for servicer {} in session {}",
        kind_label(key.kind),
        key.servicer,
        hex::encode(key.header_hash)
    ))
}
