// ── Connectivity state machine ──
//
// Pure hysteresis logic: folds a stream of upstream call outcomes into an
// online/offline verdict. No locking and no notification here -- the
// manager owns both.

use std::num::NonZeroU32;

/// Health verdict for the upstream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ConnectivityState {
    Online,
    Disconnected,
}

/// Result of a single upstream call, as reported by whoever made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CallOutcome {
    Success,
    TimedOut,
}

/// Emitted on a verified state transition, never on a same-state outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ConnectivityEvent {
    Connected,
    Disconnected,
}

/// Hysteresis policy for leaving the `Online` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityPolicy {
    /// Consecutive timeouts (since the last success) required to go offline.
    pub disconnect_threshold: NonZeroU32,
}

impl ConnectivityPolicy {
    pub const DEFAULT_DISCONNECT_THRESHOLD: u32 = 3;

    /// Build a policy, clamping a zero threshold up to one.
    pub fn new(disconnect_threshold: u32) -> Self {
        Self {
            disconnect_threshold: NonZeroU32::new(disconnect_threshold).unwrap_or(NonZeroU32::MIN),
        }
    }
}

impl Default for ConnectivityPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DISCONNECT_THRESHOLD)
    }
}

/// Edge-triggered state machine behind [`DeviceConnectivityManager`](super::DeviceConnectivityManager).
///
/// Starts `Disconnected`, so the first successful call produces `Connected`.
#[derive(Debug, Clone)]
pub struct ConnectivityStateMachine {
    state: ConnectivityState,
    consecutive_timeouts: u32,
    policy: ConnectivityPolicy,
}

impl ConnectivityStateMachine {
    pub fn new(policy: ConnectivityPolicy) -> Self {
        Self {
            state: ConnectivityState::Disconnected,
            consecutive_timeouts: 0,
            policy,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    pub fn policy(&self) -> ConnectivityPolicy {
        self.policy
    }

    /// Fold one outcome in. Returns the event for the transition it caused, if any.
    pub fn record(&mut self, outcome: CallOutcome) -> Option<ConnectivityEvent> {
        match (outcome, self.state) {
            (CallOutcome::Success, ConnectivityState::Online) => {
                self.consecutive_timeouts = 0;
                None
            }
            (CallOutcome::Success, ConnectivityState::Disconnected) => {
                self.consecutive_timeouts = 0;
                self.state = ConnectivityState::Online;
                Some(ConnectivityEvent::Connected)
            }
            (CallOutcome::TimedOut, ConnectivityState::Online) => {
                self.consecutive_timeouts = self.consecutive_timeouts.saturating_add(1);
                if self.consecutive_timeouts >= self.policy.disconnect_threshold.get() {
                    self.consecutive_timeouts = 0;
                    self.state = ConnectivityState::Disconnected;
                    Some(ConnectivityEvent::Disconnected)
                } else {
                    None
                }
            }
            // Already offline: further timeouts carry no new information.
            (CallOutcome::TimedOut, ConnectivityState::Disconnected) => None,
        }
    }
}
