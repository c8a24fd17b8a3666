use crate::error::TransportError;
use crate::protocol::UpstreamProtocol;
use crate::transport::UpstreamTransport;

/// One live, initialized connection to the upstream hub.
///
/// Owned exclusively by whoever asked for it. Dropping the client drops the
/// transport; prefer [`close`](Self::close) for a graceful shutdown.
#[derive(Debug)]
pub struct UpstreamClient<T> {
    protocol: UpstreamProtocol,
    transport: T,
}

impl<T: UpstreamTransport> UpstreamClient<T> {
    pub(crate) fn new(protocol: UpstreamProtocol, transport: T) -> Self {
        Self {
            protocol,
            transport,
        }
    }

    /// Protocol the connection was negotiated on.
    pub fn protocol(&self) -> UpstreamProtocol {
        self.protocol
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub async fn close(self) -> Result<(), TransportError> {
        self.transport.close().await
    }
}
