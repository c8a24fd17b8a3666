// ── Upstream client provider ──
//
// Opens the gateway's upstream connection. A pinned protocol gets exactly
// one attempt; otherwise the fallback order is walked until a protocol
// connects. Each attempt is reported to the connectivity manager. The
// caller's initialization callback runs once on the opened client before
// it is handed out; if it fails the transport is closed.

use std::sync::Arc;

use edgehub_core::ConnectivityManager;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::UpstreamClient;
use crate::error::{Error, InitializeError};
use crate::protocol::{ProtocolOrder, UpstreamProtocol};
use crate::token::TokenProvider;
use crate::transport::{
    ConnectRequest, ProxyConfig, StatusChangedHandler, TransportConnector, UpstreamTarget,
    UpstreamTransport, product_info,
};

/// Protocol selection and connection options.
#[derive(Debug, Clone, Default)]
pub struct UpstreamSettings {
    /// Pinned protocol. `None` walks `fallback_order`.
    pub protocol: Option<UpstreamProtocol>,
    pub proxy: Option<ProxyConfig>,
    /// Prepended to the gateway's own product identifier.
    pub product_info: Option<String>,
    pub fallback_order: ProtocolOrder,
}

/// Builds [`UpstreamClient`]s through a [`TransportConnector`].
///
/// Shared as `Arc<UpstreamClientProvider<C>>`; `create` may run
/// concurrently from several tasks.
pub struct UpstreamClientProvider<C> {
    connector: C,
    target: UpstreamTarget,
    settings: UpstreamSettings,
    product_info: String,
    token_provider: Arc<dyn TokenProvider>,
    connectivity: Arc<dyn ConnectivityManager>,
}

impl<C: TransportConnector> UpstreamClientProvider<C> {
    pub fn new(
        connector: C,
        target: UpstreamTarget,
        settings: UpstreamSettings,
        token_provider: Arc<dyn TokenProvider>,
        connectivity: Arc<dyn ConnectivityManager>,
    ) -> Result<Self, Error> {
        let product_info = product_info(settings.product_info.as_deref());
        let provider = Self {
            connector,
            target,
            settings,
            product_info,
            token_provider,
            connectivity,
        };

        if provider.candidates().is_empty() {
            return Err(Error::InvalidConfiguration(
                "a proxy is configured but no protocol in the fallback order can use it".into(),
            ));
        }
        if let (Some(protocol), Some(proxy)) = (provider.settings.protocol, &provider.settings.proxy) {
            if !protocol.supports_proxy() {
                warn!(%protocol, %proxy, "pinned upstream protocol cannot use a proxy; connecting directly");
            }
        }

        Ok(provider)
    }

    pub fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    pub fn settings(&self) -> &UpstreamSettings {
        &self.settings
    }

    /// Product-info string sent with every connection.
    pub fn product_info(&self) -> &str {
        &self.product_info
    }

    /// Protocols `create` will try, in order.
    ///
    /// With a proxy configured and nothing pinned, protocols that cannot
    /// cross the proxy are skipped.
    pub fn candidates(&self) -> Vec<UpstreamProtocol> {
        match self.settings.protocol {
            Some(protocol) => vec![protocol],
            None => self
                .settings
                .fallback_order
                .iter()
                .copied()
                .filter(|p| self.settings.proxy.is_none() || p.supports_proxy())
                .collect(),
        }
    }

    /// Open and initialize an upstream client.
    ///
    /// `status_handler` is registered with the transport before
    /// `initialize` runs. Dropping the returned future releases any
    /// transport it opened.
    pub async fn create<F>(
        &self,
        status_handler: StatusChangedHandler,
        initialize: F,
    ) -> Result<UpstreamClient<C::Transport>, Error>
    where
        F: for<'a> FnOnce(&'a mut UpstreamClient<C::Transport>) -> BoxFuture<'a, Result<(), InitializeError>>
            + Send,
    {
        let (protocol, transport) = self.connect(status_handler).await?;
        let mut client = UpstreamClient::new(protocol, transport);

        if let Err(source) = initialize(&mut client).await {
            warn!(%protocol, target = %self.target, error = %source, "upstream client initialization failed");
            if let Err(e) = client.close().await {
                warn!(%protocol, error = %e, "closing uninitialized upstream client failed");
            }
            return Err(Error::InitializationFailed { protocol, source });
        }

        info!(%protocol, target = %self.target, "upstream client ready");
        Ok(client)
    }

    /// [`create`](Self::create), aborting with [`Error::Cancelled`] once
    /// `cancel` fires. Transports opened before cancellation are released.
    pub async fn create_with_cancel<F>(
        &self,
        status_handler: StatusChangedHandler,
        initialize: F,
        cancel: &CancellationToken,
    ) -> Result<UpstreamClient<C::Transport>, Error>
    where
        F: for<'a> FnOnce(&'a mut UpstreamClient<C::Transport>) -> BoxFuture<'a, Result<(), InitializeError>>
            + Send,
    {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(target = %self.target, "upstream client creation cancelled");
                Err(Error::Cancelled)
            }
            result = self.create(status_handler, initialize) => result,
        }
    }

    async fn connect(
        &self,
        status_handler: StatusChangedHandler,
    ) -> Result<(UpstreamProtocol, C::Transport), Error> {
        let pinned = self.settings.protocol.is_some();
        let mut failures = Vec::new();

        for protocol in self.candidates() {
            debug!(%protocol, target = %self.target, "opening upstream connection");
            let request = self.connect_request(protocol, Arc::clone(&status_handler));

            match self.connector.connect(request).await {
                Ok(transport) => {
                    self.connectivity.call_succeeded();
                    info!(%protocol, target = %self.target, "upstream connection opened");
                    return Ok((protocol, transport));
                }
                Err(source) => {
                    self.connectivity.call_timed_out();
                    warn!(%protocol, target = %self.target, error = %source, "upstream connection attempt failed");
                    if pinned {
                        return Err(Error::ConnectionFailed { protocol, source });
                    }
                    failures.push((protocol, source));
                }
            }
        }

        Err(Error::AllProtocolsFailed { failures })
    }

    fn connect_request(&self, protocol: UpstreamProtocol, status_handler: StatusChangedHandler) -> ConnectRequest {
        ConnectRequest {
            protocol,
            target: self.target.clone(),
            proxy: self
                .settings
                .proxy
                .clone()
                .filter(|_| protocol.supports_proxy()),
            product_info: self.product_info.clone(),
            token_provider: Arc::clone(&self.token_provider),
            status_handler,
        }
    }
}

/// Initialization callback that does nothing.
pub fn no_initialize<T: UpstreamTransport>(
    _client: &mut UpstreamClient<T>,
) -> BoxFuture<'_, Result<(), InitializeError>> {
    Box::pin(async { Ok(()) })
}
