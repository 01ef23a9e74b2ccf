//! hyper-util connector that dials through a [`Binder`].

use crate::base::neterror::NetError;
use crate::socket::binder::Binder;
use crate::socket::stream::BoundStream;
use http::Uri;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Alias for the `Future` type returned by [`BinderConnector`].
pub type Connecting = Pin<Box<dyn Future<Output = Result<BoundStream, NetError>> + Send>>;

/// Connector for `hyper_util::client::legacy::Client`.
///
/// Every URI, whatever its authority, is dialed on the same binder.
#[derive(Clone, Debug)]
pub struct BinderConnector {
    binder: Binder,
    connect_timeout: Option<Duration>,
}

impl BinderConnector {
    pub fn new(binder: Binder) -> Self {
        Self { binder, connect_timeout: None }
    }

    /// Give up on a dial nobody accepts within `timeout`.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl tower_service::Service<Uri> for BinderConnector {
    type Response = BoundStream;
    type Error = NetError;
    type Future = Connecting;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let binder = self.binder.clone();
        let timeout = self.connect_timeout;
        Box::pin(async move {
            let address = uri.authority().map(|a| a.as_str()).unwrap_or_default();
            tracing::trace!(%uri, "connecting through binder");
            match timeout {
                Some(limit) => {
                    binder.dial_context(tokio::time::sleep(limit), "tcp", address).await
                }
                None => binder.dial("tcp", address).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_service::Service;

    #[tokio::test]
    async fn test_connector_dials_binder() {
        let binder = Binder::new();
        let mut connector = BinderConnector::new(binder.clone());

        let uri: Uri = "http://anything.invalid:1234/path".parse().unwrap();
        let (client, server) = tokio::join!(connector.call(uri), binder.accept());
        let (client, server) = (client.unwrap(), server.unwrap());
        assert_eq!(client.peer_id(), server.id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_cancels_dial() {
        let binder = Binder::new();
        let mut connector = BinderConnector::new(binder.clone())
            .with_connect_timeout(Some(Duration::from_millis(50)));

        let err = connector.call("http://memnet/".parse().unwrap()).await.unwrap_err();
        assert_eq!(err, NetError::DialCanceled);
        assert_eq!(binder.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_connector_after_close() {
        let binder = Binder::new();
        binder.close().unwrap();
        let mut connector = BinderConnector::new(binder);
        let err = connector.call("http://memnet/".parse().unwrap()).await.unwrap_err();
        assert_eq!(err, NetError::ListenerClosed);
    }
}
