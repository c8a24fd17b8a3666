use std::fmt::Write as _;

use thiserror::Error;

use crate::protocol::UpstreamProtocol;

/// Error returned by the caller's initialization callback.
pub type InitializeError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for the `edgehub-upstream` crate.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connect ─────────────────────────────────────────────────────
    /// A pinned protocol failed to connect. No fallback was attempted.
    #[error("Upstream connection over {protocol} failed: {source}")]
    ConnectionFailed {
        protocol: UpstreamProtocol,
        #[source]
        source: TransportError,
    },

    /// Every candidate in the fallback order failed, in attempt order.
    #[error("All upstream protocols failed: {}", describe_failures(.failures))]
    AllProtocolsFailed {
        failures: Vec<(UpstreamProtocol, TransportError)>,
    },

    // ── Initialization ──────────────────────────────────────────────
    /// The transport opened but the initialization callback failed. The
    /// transport has been closed.
    #[error("Upstream client initialization over {protocol} failed: {source}")]
    InitializationFailed {
        protocol: UpstreamProtocol,
        #[source]
        source: InitializeError,
    },

    // ── Setup ───────────────────────────────────────────────────────
    #[error("Invalid upstream configuration: {0}")]
    InvalidConfiguration(String),

    /// The caller cancelled creation. Any transport opened so far was released.
    #[error("Upstream client creation cancelled")]
    Cancelled,
}

impl Error {
    /// Protocols attempted before giving up, in order.
    pub fn attempted_protocols(&self) -> Vec<UpstreamProtocol> {
        match self {
            Self::ConnectionFailed { protocol, .. } | Self::InitializationFailed { protocol, .. } => {
                vec![*protocol]
            }
            Self::AllProtocolsFailed { failures } => failures.iter().map(|(p, _)| *p).collect(),
            Self::InvalidConfiguration(_) | Self::Cancelled => Vec::new(),
        }
    }
}

fn describe_failures(failures: &[(UpstreamProtocol, TransportError)]) -> String {
    let mut out = String::new();
    for (i, (protocol, err)) in failures.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{protocol}: {err}");
    }
    out
}

/// Failure reported by a [`TransportConnector`](crate::transport::TransportConnector).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection attempt timed out")]
    Timeout,

    #[error("connection refused: {0}")]
    Refused(String),

    /// The hub rejected the token or certificate.
    #[error("upstream rejected credentials: {0}")]
    Unauthorized(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if a later attempt might succeed without a config change.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Refused(_) | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_protocols_failed_lists_every_attempt() {
        let err = Error::AllProtocolsFailed {
            failures: vec![
                (UpstreamProtocol::Amqp, TransportError::Timeout),
                (UpstreamProtocol::MqttWs, TransportError::Refused("proxy said no".into())),
            ],
        };
        assert_eq!(
            err.to_string(),
            "All upstream protocols failed: Amqp: connection attempt timed out; \
             MqttWs: connection refused: proxy said no"
        );
        assert_eq!(
            err.attempted_protocols(),
            vec![UpstreamProtocol::Amqp, UpstreamProtocol::MqttWs]
        );
    }

    #[test]
    fn credential_rejection_is_not_transient() {
        assert!(TransportError::Timeout.is_transient());
        assert!(!TransportError::Unauthorized("expired".into()).is_transient());
    }
}
