//! Stop signal for the balancer's background loops.
//!
//! The stats publisher is the only long-running task today; the binary
//! owns the `Shutdown` and fires it from the Ctrl+C handler.

use tokio::sync::broadcast;

/// One-shot stop broadcast.
///
/// Every loop takes its own receiver via [`Shutdown::subscribe`] before it
/// starts; a receiver created after [`Shutdown::trigger`] never sees the signal.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver to hand to a publisher loop.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell every subscribed loop to stop. No-op without subscribers.
    pub fn trigger(&self) {
        let stopped = self.tx.send(()).unwrap_or(0);
        tracing::debug!(loops = stopped, "Shutdown triggered");
    }

    /// Loops still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
