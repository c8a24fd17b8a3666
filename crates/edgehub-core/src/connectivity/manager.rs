// ── Connectivity managers ──
//
// `ConnectivityManager` is the seam every upstream caller reports through.
// `DeviceConnectivityManager` applies the hysteresis policy; the null
// variant is wired in when connectivity tracking is disabled.

use std::sync::{Mutex, PoisonError};

use dashmap::DashSet;
use tokio::runtime::Handle;
use tracing::{info, trace};

use super::observers::{ConnectivityHandler, ObserverList, SubscriptionId, SubscriptionIds};
use super::state::{
    CallOutcome, ConnectivityPolicy, ConnectivityState, ConnectivityStateMachine,
};

/// Aggregates upstream call outcomes into connectivity transitions.
///
/// Shared process-wide as `Arc<dyn ConnectivityManager>`; every method is
/// safe to call concurrently.
pub trait ConnectivityManager: Send + Sync {
    /// Record the outcome of one upstream call. Never blocks on subscribers.
    fn report_outcome(&self, outcome: CallOutcome);

    /// Register a handler for `Connected` / `Disconnected` events.
    fn subscribe(&self, handler: ConnectivityHandler) -> SubscriptionId;

    /// Remove a handler. Returns `false` if the id was unknown or already
    /// removed. Events still queued for the handler are discarded.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Current verdict.
    fn state(&self) -> ConnectivityState;

    fn call_succeeded(&self) {
        self.report_outcome(CallOutcome::Success);
    }

    fn call_timed_out(&self) {
        self.report_outcome(CallOutcome::TimedOut);
    }
}

// ── DeviceConnectivityManager ────────────────────────────────────────

/// Hysteresis-driven connectivity manager.
///
/// Counter updates and event queueing happen under one short critical
/// section, which keeps transitions linearizable and per-subscriber
/// delivery chronological. Each handler runs on its own task, spawned on
/// the runtime captured at construction (or current at subscribe time);
/// with no runtime in reach it gets a dedicated thread instead.
pub struct DeviceConnectivityManager {
    machine: Mutex<ConnectivityStateMachine>,
    observers: ObserverList,
}

impl DeviceConnectivityManager {
    pub fn new(policy: ConnectivityPolicy) -> Self {
        Self::build(policy, Handle::try_current().ok())
    }

    /// Deliver events on `runtime` regardless of where `subscribe` is called.
    pub fn with_runtime(policy: ConnectivityPolicy, runtime: Handle) -> Self {
        Self::build(policy, Some(runtime))
    }

    fn build(policy: ConnectivityPolicy, runtime: Option<Handle>) -> Self {
        Self {
            machine: Mutex::new(ConnectivityStateMachine::new(policy)),
            observers: ObserverList::new(runtime),
        }
    }

    pub fn policy(&self) -> ConnectivityPolicy {
        self.lock().policy()
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConnectivityStateMachine> {
        // The machine is plain data; a panic elsewhere cannot leave it torn.
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DeviceConnectivityManager {
    fn default() -> Self {
        Self::new(ConnectivityPolicy::default())
    }
}

impl ConnectivityManager for DeviceConnectivityManager {
    fn report_outcome(&self, outcome: CallOutcome) {
        let mut machine = self.lock();
        trace!(%outcome, state = %machine.state(), "upstream call outcome");

        if let Some(event) = machine.record(outcome) {
            info!(%event, state = %machine.state(), "upstream connectivity changed");
            self.observers.notify(event);
        }
    }

    fn subscribe(&self, handler: ConnectivityHandler) -> SubscriptionId {
        self.observers.subscribe(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn state(&self) -> ConnectivityState {
        self.lock().state()
    }
}

// ── NullConnectivityManager ──────────────────────────────────────────

/// Accepts every call and subscription and never emits an event.
///
/// Reports `Online` so callers gating on connectivity are never blocked
/// when tracking is turned off.
#[derive(Debug, Default)]
pub struct NullConnectivityManager {
    ids: SubscriptionIds,
    live: DashSet<SubscriptionId>,
}

impl NullConnectivityManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConnectivityManager for NullConnectivityManager {
    fn report_outcome(&self, _outcome: CallOutcome) {}

    fn subscribe(&self, _handler: ConnectivityHandler) -> SubscriptionId {
        let id = self.ids.next();
        self.live.insert(id);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.live.remove(&id).is_some()
    }

    fn state(&self) -> ConnectivityState {
        ConnectivityState::Online
    }
}
