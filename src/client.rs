//! HTTP client whose connections run through a [`Binder`].
//!
//! The client is an ordinary `hyper_util` pooled client. Only the connector
//! differs: instead of opening TCP sockets it dials the binder, so requests
//! reach whatever server is accepting on it.
//!
//! # Example
//!
//! ```rust,ignore
//! use memnet::{Binder, HttpClient};
//!
//! let binder = Binder::new();
//! let client: HttpClient = binder.client();
//!
//! let resp = client.get("http://memnet/health".parse()?).await?;
//! ```

use crate::http::connector::BinderConnector;
use crate::socket::binder::Binder;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::time::Duration;

/// Pooled HTTP client over a binder.
pub type HttpClient<B = Full<Bytes>> = Client<BinderConnector, B>;

/// Client settings. Defaults follow the usual defaults of a general purpose
/// HTTP transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: usize,
    connect_timeout: Option<Duration>,
    http2_only: bool,
    retry_canceled_requests: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: usize::MAX,
            connect_timeout: Some(Duration::from_secs(30)),
            http2_only: false,
            retry_canceled_requests: true,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long an idle pooled connection is kept. `None` keeps it forever.
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Maximum idle connections kept per host. Zero disables reuse.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// How long a dial waits for the server to accept.
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Speak HTTP/2 with prior knowledge instead of HTTP/1.1.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Retry requests that failed because a pooled connection closed first.
    pub fn retry_canceled_requests(mut self, enabled: bool) -> Self {
        self.retry_canceled_requests = enabled;
        self
    }

    /// Build a client dialing through `binder`.
    pub fn build<B>(&self, binder: &Binder) -> HttpClient<B>
    where
        B: Body + Send,
        B::Data: Send,
    {
        let connector =
            BinderConnector::new(binder.clone()).with_connect_timeout(self.connect_timeout);

        Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(self.pool_idle_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .http2_only(self.http2_only)
            .retry_canceled_requests(self.retry_canceled_requests)
            .build(connector)
    }
}

impl Binder {
    /// HTTP client with default settings that dials only this binder.
    pub fn client<B>(&self) -> HttpClient<B>
    where
        B: Body + Send,
        B::Data: Send,
    {
        ClientConfig::default().build(self)
    }

    /// HTTP client with custom settings that dials only this binder.
    pub fn client_with_config<B>(&self, config: &ClientConfig) -> HttpClient<B>
    where
        B: Body + Send,
        B::Data: Send,
    {
        config.build(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.pool_idle_timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.pool_max_idle_per_host, usize::MAX);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(30)));
        assert!(!config.http2_only);
        assert!(config.retry_canceled_requests);
    }

    #[test]
    fn test_config_setters() {
        let config = ClientConfig::new()
            .pool_idle_timeout(None)
            .pool_max_idle_per_host(0)
            .connect_timeout(Some(Duration::from_millis(5)))
            .http2_only(true)
            .retry_canceled_requests(false);
        assert_eq!(config.pool_idle_timeout, None);
        assert_eq!(config.pool_max_idle_per_host, 0);
        assert_eq!(config.connect_timeout, Some(Duration::from_millis(5)));
        assert!(config.http2_only);
        assert!(!config.retry_canceled_requests);
    }
}
