use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::shared::constants::SUBSCRIBER_CHANNEL_CAPACITY;
use crate::shared::encoded_frame::EncodedFrame;

/// Fans encoded frames out to every connected stream subscriber.
///
/// Each subscriber gets its own bounded channel. A subscriber whose buffer is
/// full misses the frame, so one slow client never stalls the producer.
/// Subscribers whose receiver was dropped are pruned on the next publish.
pub struct FrameBroadcaster {
    subscribers: Mutex<Vec<Sender<EncodedFrame>>>,
    capacity: usize,
    closed: AtomicBool,
}

impl FrameBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Sender<EncodedFrame>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new subscriber. After [`close`](Self::close) the returned
    /// receiver is already disconnected.
    pub fn subscribe(&self) -> Receiver<EncodedFrame> {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        let mut subscribers = self.lock();
        if !self.closed.load(Ordering::Acquire) {
            subscribers.push(tx);
            log::debug!("Stream subscriber added ({} active)", subscribers.len());
        }
        rx
    }

    /// Offers `frame` to every subscriber and returns how many accepted it.
    pub fn publish(&self, frame: &EncodedFrame) -> usize {
        let mut delivered = 0;
        let mut subscribers = self.lock();
        subscribers.retain(|tx| match tx.try_send(frame.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("Stream subscriber disconnected");
                false
            }
        });
        delivered
    }

    /// Disconnects all subscribers. Their receivers drain what is buffered
    /// and then observe end of stream.
    pub fn close(&self) {
        let mut subscribers = self.lock();
        self.closed.store(true, Ordering::Release);
        subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }
}

impl Default for FrameBroadcaster {
    fn default() -> Self {
        Self::new(SUBSCRIBER_CHANNEL_CAPACITY)
    }
}
