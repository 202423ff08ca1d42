use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::attention_status::AttentionStatus;

/// Lock-free snapshot of the latest [`AttentionStatus`].
///
/// The producer loop is the only writer; any number of request handlers
/// read concurrently. Neither side blocks, and readers never see a torn value.
#[derive(Clone, Debug)]
pub struct StatusCell {
    value: Arc<AtomicU8>,
}

impl StatusCell {
    pub fn new(initial: AttentionStatus) -> Self {
        Self {
            value: Arc::new(AtomicU8::new(initial.to_u8())),
        }
    }

    pub fn load(&self) -> AttentionStatus {
        AttentionStatus::from_u8(self.value.load(Ordering::Acquire))
    }

    pub fn store(&self, status: AttentionStatus) {
        self.value.store(status.to_u8(), Ordering::Release);
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new(AttentionStatus::Focused)
    }
}
