//! Upstream client factory for the edgehub gateway.
//!
//! [`UpstreamClientProvider`] opens one connection to the cloud hub through
//! a pluggable [`TransportConnector`], either over a pinned
//! [`UpstreamProtocol`] or by walking a [`ProtocolOrder`] until a protocol
//! connects. Every attempt is reported to the shared
//! [`ConnectivityManager`](edgehub_core::ConnectivityManager), and the
//! returned [`UpstreamClient`] has already completed its one-time
//! initialization.
//!
//! The AMQP/MQTT stacks themselves live behind the connector trait.

pub mod client;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod token;
pub mod transport;

pub use client::UpstreamClient;
pub use error::{Error, InitializeError, TransportError};
pub use protocol::{ProtocolOrder, UpstreamProtocol};
pub use provider::{UpstreamClientProvider, UpstreamSettings, no_initialize};
pub use token::{StaticTokenProvider, TokenProvider};
pub use transport::{
    ConnectRequest, ConnectionStatus, ConnectionStatusChangeReason, ProxyConfig,
    StatusChangedHandler, TransportConnector, UpstreamTarget, UpstreamTransport, product_info,
};
