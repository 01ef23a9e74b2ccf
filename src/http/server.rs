//! Serve HTTP/1 on connections accepted from a [`Binder`].

use crate::base::neterror::NetError;
use crate::socket::binder::Binder;
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper::{Request, Response};
use std::error::Error as StdError;
use tokio::spawn;

/// Accept connections until the binder closes, driving each one with `service`
/// on its own task.
///
/// Returns `Ok(())` once the binder is closed. Per-connection errors are
/// logged and do not stop the loop.
pub async fn serve_http1<S, B>(binder: Binder, service: S) -> Result<(), NetError>
where
    S: Service<Request<Incoming>, Response = Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<Box<dyn StdError + Send + Sync>>,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    loop {
        let stream = match binder.accept().await {
            Ok(stream) => stream,
            Err(NetError::ListenerClosed) => return Ok(()),
            Err(e) => return Err(e),
        };
        let conn_id = stream.id();
        let service = service.clone();

        // Spawn the connection driver
        spawn(async move {
            if let Err(e) = http1::Builder::new().serve_connection(stream, service).await {
                tracing::debug!(conn = conn_id, error = %e, "http connection ended with error");
            }
        });
    }
}
