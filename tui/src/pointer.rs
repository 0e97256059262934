//! Pointer clicks that no widget consumed, fanned out to whoever is currently
//! listening.
//!
//! Widgets that close on an outside click hold a [`PointerSubscription`] only
//! while they are active. Dropping the subscription unregisters it.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Clicks are drained on the UI thread right after they are published, so the
/// buffer only needs to absorb a burst.
const POINTER_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PointerClick {
    pub column: u16,
    pub row: u16,
}

#[derive(Debug, Clone)]
pub(crate) struct PointerListeners {
    tx: broadcast::Sender<PointerClick>,
}

impl PointerListeners {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(POINTER_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> PointerSubscription {
        PointerSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Deliver a click to every live subscription. A click with no listeners
    /// is dropped.
    pub(crate) fn publish(&self, click: PointerClick) {
        if self.tx.send(click).is_err() {
            tracing::trace!("pointer click with no listeners");
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PointerListeners {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub(crate) struct PointerSubscription {
    rx: broadcast::Receiver<PointerClick>,
}

impl PointerSubscription {
    /// Take every click published since the last call.
    pub(crate) fn drain(&mut self) -> Vec<PointerClick> {
        let mut clicks = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(click) => clicks.push(click),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("dropped {skipped} pointer clicks");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        clicks
    }
}
