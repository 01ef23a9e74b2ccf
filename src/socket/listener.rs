//! Listener and dialer capability traits.
//!
//! [`Binder`] implements both. Servers written against [`Listener`] and
//! clients written against [`Dialer`] can run over a binder in tests and over
//! a real transport elsewhere.

use crate::base::neterror::NetError;
use crate::socket::addr::PipeAddr;
use crate::socket::binder::Binder;
use crate::socket::stream::BoundStream;
use std::{future::Future, pin::Pin, sync::Arc};

/// Alias for the `Future` type returned by [`Listener::accept`].
pub type Accepting = Pin<Box<dyn Future<Output = Result<BoundStream, NetError>> + Send>>;

/// Alias for the `Future` type returned by [`Dialer`] methods.
pub type Dialing = Pin<Box<dyn Future<Output = Result<BoundStream, NetError>> + Send>>;

/// Cancellation signal passed to [`Dialer::dial_context`]. The dial gives up
/// when this future completes.
pub type Cancel = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Accepts incoming connections.
pub trait Listener: Send + Sync {
    /// Waits for the next connection.
    fn accept(&self) -> Accepting;

    /// Stops accepting and closes open connections. Idempotent.
    fn close(&self) -> Result<(), NetError>;

    /// The listener's address.
    fn addr(&self) -> PipeAddr;
}

/// Opens outgoing connections.
pub trait Dialer: Send + Sync {
    /// Connects, waiting as long as it takes.
    fn dial(&self, network: &str, address: &str) -> Dialing;

    /// Connects, giving up when `cancel` completes.
    fn dial_context(&self, cancel: Cancel, network: &str, address: &str) -> Dialing;
}

impl Listener for Binder {
    fn accept(&self) -> Accepting {
        let binder = self.clone();
        Box::pin(async move { binder.accept().await })
    }

    fn close(&self) -> Result<(), NetError> {
        Binder::close(self)
    }

    fn addr(&self) -> PipeAddr {
        Binder::addr(self)
    }
}

impl Dialer for Binder {
    fn dial(&self, network: &str, address: &str) -> Dialing {
        Dialer::dial_context(self, Box::pin(std::future::pending()), network, address)
    }

    fn dial_context(&self, cancel: Cancel, network: &str, address: &str) -> Dialing {
        let binder = self.clone();
        let (network, address) = (network.to_owned(), address.to_owned());
        Box::pin(async move { binder.dial_context(cancel, &network, &address).await })
    }
}

/// Blanket implementation for Arc-wrapped listeners.
impl<L: Listener + ?Sized> Listener for Arc<L> {
    fn accept(&self) -> Accepting {
        (**self).accept()
    }

    fn close(&self) -> Result<(), NetError> {
        (**self).close()
    }

    fn addr(&self) -> PipeAddr {
        (**self).addr()
    }
}

/// Blanket implementation for Arc-wrapped dialers.
impl<D: Dialer + ?Sized> Dialer for Arc<D> {
    fn dial(&self, network: &str, address: &str) -> Dialing {
        (**self).dial(network, address)
    }

    fn dial_context(&self, cancel: Cancel, network: &str, address: &str) -> Dialing {
        (**self).dial_context(cancel, network, address)
    }
}
