// Path: crates/test_utils/src/broadcaster.rs
//! A broadcaster that records messages instead of sending them.

use async_trait::async_trait;
use parking_lot::Mutex;
use viper_api::transaction::{BroadcastError, TxBroadcaster, TxHash};
use viper_types::app::Msg;
use viper_types::codec::canonical_json_hash;

/// Records every broadcast message. A queued failure is returned by the next
/// broadcast only.
#[derive(Debug, Default)]
pub struct MockBroadcaster {
    sent: Mutex<Vec<Msg>>,
    fail_next: Mutex<Option<BroadcastError>>,
}

impl MockBroadcaster {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next broadcast fail with `error`.
    pub fn fail_next(&self, error: BroadcastError) {
        *self.fail_next.lock() = Some(error);
    }

    /// Every message broadcast so far.
    pub fn sent(&self) -> Vec<Msg> {
        self.sent.lock().clone()
    }

    /// Drains the recorded messages.
    pub fn take(&self) -> Vec<Msg> {
        std::mem::take(&mut *self.sent.lock())
    }
}

#[async_trait]
impl TxBroadcaster for MockBroadcaster {
    async fn broadcast(&self, msg: Msg) -> Result<TxHash, BroadcastError> {
        if let Some(err) = self.fail_next.lock().take() {
            return Err(err);
        }
        let hash = canonical_json_hash(&msg).map_err(BroadcastError::Transport)?;
        self.sent.lock().push(msg);
        Ok(hash)
    }
}
