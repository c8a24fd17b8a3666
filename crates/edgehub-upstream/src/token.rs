use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use secrecy::SecretString;

use crate::error::TransportError;

/// Supplies SAS tokens for the upstream connection.
///
/// Handed to the transport connector, which calls it whenever it needs a
/// fresh token (on connect and before expiry). Returns a boxed future so
/// providers can be shared as `Arc<dyn TokenProvider>`.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> BoxFuture<'_, Result<SecretString, TransportError>>;
}

/// Always returns the same token. Useful for tests and for pre-issued
/// long-lived tokens.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn token(&self) -> BoxFuture<'_, Result<SecretString, TransportError>> {
        let token = self.token.clone();
        async move { Ok(token) }.boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::sync::Arc;

    #[tokio::test]
    async fn static_provider_hands_out_its_token() {
        let provider: Arc<dyn TokenProvider> = Arc::new(StaticTokenProvider::new("sig=abc"));
        let token = provider.token().await.unwrap();
        assert_eq!(token.expose_secret(), "sig=abc");
        assert!(!format!("{:?}", StaticTokenProvider::new("sig=abc")).contains("abc"));
    }
}
