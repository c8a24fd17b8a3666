//! Upstream connectivity tracking.
//!
//! Callers report [`CallOutcome`]s; a [`ConnectivityManager`] folds them into
//! an online/offline verdict with hysteresis and notifies subscribers on
//! each edge. [`NullConnectivityManager`] satisfies the same contract
//! without ever emitting.

mod manager;
mod observers;
mod state;

pub use manager::{ConnectivityManager, DeviceConnectivityManager, NullConnectivityManager};
pub use observers::{ConnectivityHandler, SubscriptionId};
pub use state::{
    CallOutcome, ConnectivityEvent, ConnectivityPolicy, ConnectivityState,
    ConnectivityStateMachine,
};
