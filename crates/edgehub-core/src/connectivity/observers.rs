// ── Connectivity event observers ──
//
// Subscriber identity -> delivery queue. Each subscriber owns an unbounded
// queue drained by its own task, so a slow handler never stalls the
// reporting path and every handler sees events in commit order.
//
// Unsubscribing cancels the subscriber's token. Delivery checks it before
// every handler call, so queued events are discarded rather than delivered;
// a call already in progress runs to completion.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::state::ConnectivityEvent;

/// Callback invoked for every connectivity transition.
pub type ConnectivityHandler = Arc<dyn Fn(ConnectivityEvent) + Send + Sync>;

/// Opaque handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Hands out unique subscription ids.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionIds(AtomicU64);

impl SubscriptionIds {
    pub(crate) fn next(&self) -> SubscriptionId {
        SubscriptionId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

struct Subscriber {
    queue: mpsc::UnboundedSender<ConnectivityEvent>,
    cancel: CancellationToken,
}

/// Receiving half of one subscription.
struct Delivery {
    id: SubscriptionId,
    handler: ConnectivityHandler,
    queue: mpsc::UnboundedReceiver<ConnectivityEvent>,
    cancel: CancellationToken,
}

impl Delivery {
    async fn run(mut self) {
        loop {
            let event = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                event = self.queue.recv() => event,
            };
            let Some(event) = event else { break };
            if !self.deliver(event) {
                break;
            }
        }
        trace!(subscription = %self.id, "connectivity subscriber drained");
    }

    /// Used when no Tokio runtime is reachable at subscribe time.
    fn run_blocking(mut self) {
        while let Some(event) = self.queue.blocking_recv() {
            if !self.deliver(event) {
                break;
            }
        }
        trace!(subscription = %self.id, "connectivity subscriber drained");
    }

    fn deliver(&self, event: ConnectivityEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        (self.handler)(event);
        true
    }
}

#[derive(Default)]
pub(crate) struct ObserverList {
    ids: SubscriptionIds,
    runtime: Option<Handle>,
    subscribers: DashMap<SubscriptionId, Subscriber>,
}

impl ObserverList {
    /// Delivery tasks go to `runtime` when given, else to whatever runtime
    /// is current at subscribe time, else to a dedicated thread.
    pub(crate) fn new(runtime: Option<Handle>) -> Self {
        Self {
            runtime,
            ..Self::default()
        }
    }

    /// Register a handler and start its delivery loop.
    pub(crate) fn subscribe(&self, handler: ConnectivityHandler) -> SubscriptionId {
        let id = self.ids.next();
        let (tx, rx) = mpsc::unbounded_channel::<ConnectivityEvent>();
        let cancel = CancellationToken::new();
        let delivery = Delivery {
            id,
            handler,
            queue: rx,
            cancel: cancel.clone(),
        };

        match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => {
                runtime.spawn(delivery.run());
            }
            None => {
                let spawned = thread::Builder::new()
                    .name(format!("connectivity-{id}"))
                    .spawn(move || delivery.run_blocking());
                // The queue's receiver is gone; the first notify prunes it.
                if let Err(e) = spawned {
                    warn!(subscription = %id, error = %e, "failed to start connectivity delivery thread");
                }
            }
        }

        self.subscribers.insert(id, Subscriber { queue: tx, cancel });
        debug!(subscription = %id, "connectivity subscriber added");
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Some((_, subscriber)) = self.subscribers.remove(&id) else {
            return false;
        };
        subscriber.cancel.cancel();
        debug!(subscription = %id, "connectivity subscriber removed");
        true
    }

    /// Queue `event` for every current subscriber.
    ///
    /// The subscriber list is snapshotted first so concurrent
    /// subscribe/unsubscribe never races the iteration.
    pub(crate) fn notify(&self, event: ConnectivityEvent) {
        let snapshot: Vec<(SubscriptionId, mpsc::UnboundedSender<ConnectivityEvent>)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().queue.clone()))
            .collect();

        for (id, tx) in snapshot {
            // A closed queue means the delivery loop died (the handler panicked).
            if tx.send(event).is_err() {
                debug!(subscription = %id, "dropping dead connectivity subscriber");
                self.subscribers.remove(&id);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}
