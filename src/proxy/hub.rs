//! Refresh signal fan-out.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::debug;

/// Fan-out hub for refresh signals.
///
/// Each subscriber is a capacity-1 channel: a signal that hasn't been
/// drained by the browser yet absorbs all later ones, so refreshes
/// coalesce instead of queueing.
#[derive(Default)]
pub struct RefreshHub {
    subscribers: Mutex<FxHashMap<u64, mpsc::Sender<()>>>,
    next_id: AtomicU64,
}

impl RefreshHub {
    /// Broadcast a refresh signal to every subscriber. Never blocks; full
    /// channels drop the signal.
    pub fn refresh(&self) {
        let subscribers = self.subscribers.lock();
        debug!("proxy"; "refreshing {} subscriber(s)", subscribers.len());

        for sender in subscribers.values() {
            let _ = sender.try_send(());
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// Non-owning refresh endpoint handed to reactors.
#[derive(Clone)]
pub struct RefreshHandle(Arc<RefreshHub>);

impl RefreshHandle {
    pub(super) fn new(hub: &Arc<RefreshHub>) -> Self {
        Self(Arc::clone(hub))
    }

    /// Broadcast a refresh to all connected browsers.
    pub fn refresh(&self) {
        self.0.refresh();
    }
}

/// A live subscription: a stream yielding one item per refresh signal.
///
/// Held by an SSE request handler for the lifetime of the connection;
/// dropping it (client disconnect) removes the hub entry.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<()>,
    hub: Arc<RefreshHub>,
}

impl Subscription {
    /// Register a new subscriber on `hub`; it deregisters itself on drop.
    pub fn register(hub: &Arc<RefreshHub>) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let id = hub.next_id.fetch_add(1, Ordering::Relaxed);
        hub.subscribers.lock().insert(id, tx);

        Self {
            id,
            rx,
            hub: Arc::clone(hub),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.subscribers.lock().remove(&self.id);
    }
}

impl tokio_stream::Stream for Subscription {
    type Item = ();

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<()>> {
        self.rx.poll_recv(cx)
    }
}
