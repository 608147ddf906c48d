// Path: crates/storage/tests/persistence.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use viper_storage::{EvidenceKey, EvidenceStore};
use viper_types::app::{Address, EvidenceType, Proof, PublicKey, SessionHeader, TestResult};

const SERVICER: Address = Address([3; 20]);

fn header(height: u64) -> SessionHeader {
    SessionHeader::new(PublicKey([1; 32]), "0021", height)
}

fn sample(ts: u64) -> Proof {
    Proof::Test(TestResult {
        servicer_address: SERVICER,
        timestamp: ts,
        latency_ms: 5,
        is_reliable: ts % 2 == 0,
        notes: None,
    })
}

#[test]
fn flushed_evidence_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evidence.redb");
    let key = EvidenceKey::new(&header(1), EvidenceType::FishermanTest, SERVICER);
    let root = {
        let store = EvidenceStore::open(&path, 64).unwrap();
        for ts in 1..=4 {
            store.append(&header(1), SERVICER, sample(ts)).unwrap();
        }
        let (root, _) = store.seal_and_root(&key).unwrap();
        assert_eq!(store.flush().unwrap(), 1);
        // Nothing changed since the last flush.
        assert_eq!(store.flush().unwrap(), 0);
        root
    };

    let store = EvidenceStore::open(&path, 64).unwrap();
    let evidence = store.get(&key).unwrap();
    assert!(evidence.is_sealed());
    assert_eq!(evidence.num_proofs(), 4);
    assert_eq!(store.seal_and_root(&key).unwrap().0, root);
    assert_eq!(
        store.append(&header(1), SERVICER, sample(9)),
        Err(viper_types::error::ViperError::EvidenceSealed)
    );
    let unsealed = EvidenceKey::new(&header(5), EvidenceType::FishermanTest, SERVICER);
    store.append(&header(5), SERVICER, sample(1)).unwrap();
    assert_eq!(store.count(&unsealed), 1);
}

#[test]
fn unflushed_evidence_is_lost_and_deleted_evidence_stays_gone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("evidence.redb");
    let kept = EvidenceKey::new(&header(1), EvidenceType::FishermanTest, SERVICER);
    let dropped = EvidenceKey::new(&header(5), EvidenceType::FishermanTest, SERVICER);
    {
        let store = EvidenceStore::open(&path, 64).unwrap();
        store.append(&header(1), SERVICER, sample(1)).unwrap();
        store.append(&header(5), SERVICER, sample(1)).unwrap();
        assert_eq!(store.flush().unwrap(), 2);
        store.delete(&dropped).unwrap();
        store.append(&header(1), SERVICER, sample(2)).unwrap();
    }

    let store = EvidenceStore::open(&path, 64).unwrap();
    assert_eq!(store.count(&kept), 1);
    assert!(!store.contains(&dropped));
    assert_eq!(
        store.append(&header(1), SERVICER, sample(1)),
        Err(viper_types::error::ViperError::DuplicateProof)
    );
}

#[tokio::test]
async fn flusher_writes_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evidence.redb");
    let key = EvidenceKey::new(&header(1), EvidenceType::FishermanTest, SERVICER);
    {
        let store = Arc::new(EvidenceStore::open(&path, 64).unwrap());
        let (tx, rx) = watch::channel(false);
        let handle = Arc::clone(&store).spawn_flusher(Duration::from_secs(3600), rx);
        store.append(&header(1), SERVICER, sample(7)).unwrap();
        tx.send(true).unwrap();
        handle.await.unwrap();
    }
    let store = EvidenceStore::open(&path, 64).unwrap();
    assert_eq!(store.count(&key), 1);
}
