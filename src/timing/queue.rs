use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use parking_lot::Mutex;

use super::Shutdown;
use crate::events::Event;

/// Unbounded FIFO of model events waiting for timed release.
///
/// Clones share the same queue. Any clone may push; the dispatcher pops and
/// the mode controller drains. Every clone holds both channel ends, so the
/// channel never disconnects and pushing cannot fail.
///
/// Each drain starts a new flush epoch. Producers that decided to enqueue
/// under an older epoch are turned away by [`PlaybackQueue::push_in`], so a
/// drain leaves nothing behind from before it began.
#[derive(Clone)]
pub struct PlaybackQueue {
    tx: Sender<Event>,
    rx: Receiver<Event>,
    epoch: Arc<Mutex<u64>>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam::channel::unbounded();
        Self {
            tx,
            rx,
            epoch: Arc::new(Mutex::new(0)),
        }
    }

    pub fn push(&self, event: Event) {
        let _epoch = self.epoch.lock();
        let _ = self.tx.send(event);
    }

    /// Current flush epoch. Read it before deciding to enqueue.
    pub fn epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    /// Pushes only if no drain happened since `epoch` was read. Returns
    /// whether the event was queued.
    pub fn push_in(&self, epoch: u64, event: Event) -> bool {
        let current = self.epoch.lock();
        if *current != epoch {
            return false;
        }
        let _ = self.tx.send(event);
        true
    }

    /// Blocks until an event is available or shutdown fires.
    pub fn pop(&self, shutdown: &Shutdown) -> Option<Event> {
        crossbeam::channel::select! {
            recv(self.rx) -> event => event.ok(),
            recv(shutdown.receiver()) -> _ => None,
        }
    }

    pub fn try_pop(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Discards everything queued and opens a new flush epoch, returning how
    /// many events were dropped. Pushes wait for the drain to finish.
    pub fn drain(&self) -> usize {
        let mut epoch = self.epoch.lock();
        *epoch += 1;
        self.rx.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}
