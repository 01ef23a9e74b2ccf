//! In-memory listener and dialer.
//!
//! A [`Binder`] is both ends of a network in one object. Servers call
//! [`Binder::accept`] as they would on a TCP listener; clients call
//! [`Binder::dial`] and get the other end of a fresh in-memory pipe. Each dial
//! is a rendezvous: it completes only once an accept has taken its server end.
//!
//! Every endpoint handed out is tracked so that [`Binder::close`] can close
//! whatever is still open.

use crate::base::neterror::NetError;
use crate::socket::addr::{PipeAddr, DEFAULT_LABEL};
use crate::socket::stream::{BoundStream, ConnId, ConnShared};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, Notify};

/// Default buffer size of each direction of a connected pair.
pub const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

/// Settings for a [`Binder`].
#[derive(Debug, Clone)]
pub struct BinderConfig {
    pipe_capacity: usize,
    label: String,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl BinderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes each direction of a pipe buffers before writes wait on the reader.
    /// Zero is bumped to one.
    pub fn pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity.max(1);
        self
    }

    /// Label rendered by the binder's [`PipeAddr`].
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// A server end waiting for an accept.
struct Offer {
    stream: BoundStream,
    delivered: oneshot::Sender<()>,
}

#[derive(Default)]
struct State {
    closed: bool,
    registry: HashMap<ConnId, Arc<ConnShared>>,
    offers: VecDeque<Offer>,
}

pub(crate) struct BinderInner {
    state: Mutex<State>,
    incoming: Notify,
    next_id: AtomicU64,
    addr: PipeAddr,
    pipe_capacity: usize,
}

impl BinderInner {
    // Nothing inside the lock can panic halfway through a mutation.
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deregister(&self, id: ConnId) {
        if self.lock_state().registry.remove(&id).is_some() {
            tracing::trace!(conn = id, "connection deregistered");
        }
    }

    /// Take a still-queued offer back out. Returns false if an accept (or
    /// close) got to it first.
    fn withdraw(&self, id: ConnId) -> bool {
        let offer = {
            let mut state = self.lock_state();
            let pos = state.offers.iter().position(|offer| offer.stream.id() == id);
            pos.and_then(|pos| state.offers.remove(pos))
        };
        // Dropped outside the lock: closing a stream re-enters it.
        offer.is_some()
    }
}

/// Disarmed once the dialer knows how its offer ended. Dropping it armed (the
/// dial future was dropped mid hand-off) withdraws the offer.
struct OfferGuard<'a> {
    inner: &'a BinderInner,
    id: ConnId,
    armed: bool,
}

impl OfferGuard<'_> {
    fn withdraw(&mut self) -> bool {
        self.armed = false;
        self.inner.withdraw(self.id)
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for OfferGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.withdraw(self.id);
        }
    }
}

/// In-memory listener and dialer.
///
/// Cloning is cheap and yields another handle to the same binder. Dropping
/// handles does not close it; call [`close`](Self::close).
#[derive(Clone)]
pub struct Binder {
    inner: Arc<BinderInner>,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("Binder")
            .field("addr", &self.inner.addr)
            .field("closed", &state.closed)
            .field("connections", &state.registry.len())
            .field("pending", &state.offers.len())
            .finish()
    }
}

impl Binder {
    pub fn new() -> Self {
        Self::with_config(BinderConfig::default())
    }

    pub fn with_config(config: BinderConfig) -> Self {
        Self {
            inner: Arc::new(BinderInner {
                state: Mutex::new(State::default()),
                incoming: Notify::new(),
                next_id: AtomicU64::new(1),
                addr: PipeAddr::new(config.label),
                pipe_capacity: config.pipe_capacity,
            }),
        }
    }

    /// Display-only address of this binder.
    pub fn addr(&self) -> PipeAddr {
        self.inner.addr.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock_state().closed
    }

    /// Number of endpoints currently registered (open and not yet closed).
    pub fn connection_count(&self) -> usize {
        self.inner.lock_state().registry.len()
    }

    /// Number of dials waiting for an accept.
    pub fn pending_count(&self) -> usize {
        self.inner.lock_state().offers.len()
    }

    /// Wait for the next dialed connection.
    ///
    /// Fails with [`NetError::ListenerClosed`] once the binder is closed,
    /// including for calls already waiting when [`close`](Self::close) runs.
    /// Dropping the returned future never loses a connection.
    pub async fn accept(&self) -> Result<BoundStream, NetError> {
        loop {
            let notified = self.inner.incoming.notified();
            tokio::pin!(notified);
            // Enabled before inspecting state so a close or offer landing in
            // between still wakes us.
            notified.as_mut().enable();

            let mut stale = Vec::new();
            let (taken, more) = {
                let mut state = self.inner.lock_state();
                if state.closed {
                    return Err(NetError::ListenerClosed);
                }
                let mut taken = None;
                while let Some(offer) = state.offers.pop_front() {
                    match offer.delivered.send(()) {
                        Ok(()) => {
                            taken = Some(offer.stream);
                            break;
                        }
                        // The dialer is gone; its stream still needs closing.
                        Err(()) => stale.push(offer.stream),
                    }
                }
                (taken, !state.offers.is_empty())
            };
            drop(stale);

            if let Some(stream) = taken {
                if more {
                    self.inner.incoming.notify_one();
                }
                tracing::debug!(conn = stream.id(), peer = stream.peer_id(), "accepted connection");
                return Ok(stream);
            }
            notified.await;
        }
    }

    /// Dial the binder. `network` and `address` are ignored apart from logging.
    pub async fn dial(&self, network: &str, address: &str) -> Result<BoundStream, NetError> {
        self.dial_context(std::future::pending(), network, address).await
    }

    /// Dial the binder, giving up when `cancel` completes first.
    ///
    /// The call waits until an accept takes the server end. If `cancel` wins
    /// the race both ends are closed and [`NetError::DialCanceled`] is
    /// returned; if the binder closes first the result is
    /// [`NetError::ListenerClosed`]. A closed binder fails immediately
    /// without creating a pipe.
    pub async fn dial_context<C>(
        &self,
        cancel: C,
        network: &str,
        address: &str,
    ) -> Result<BoundStream, NetError>
    where
        C: Future<Output = ()>,
    {
        let (mut client, server_id, mut delivered) = {
            let mut state = self.inner.lock_state();
            if state.closed {
                return Err(NetError::ListenerClosed);
            }
            let (client, server) = self.bind_pair(&mut state);
            let server_id = server.id();
            let (tx, rx) = oneshot::channel();
            state.offers.push_back(Offer { stream: server, delivered: tx });
            (client, server_id, rx)
        };
        self.inner.incoming.notify_one();
        tracing::trace!(
            network,
            address,
            conn = client.id(),
            peer = server_id,
            "dial waiting for accept"
        );

        let mut guard = OfferGuard {
            inner: self.inner.as_ref(),
            id: server_id,
            armed: true,
        };
        tokio::pin!(cancel);
        let outcome = tokio::select! {
            biased;
            res = &mut delivered => res.map_err(|_| NetError::ListenerClosed),
            () = &mut cancel => Err(NetError::DialCanceled),
        };

        match outcome {
            Ok(()) => guard.disarm(),
            Err(NetError::DialCanceled) => {
                if guard.withdraw() {
                    client.close_now();
                    tracing::debug!(conn = client.id(), "dial canceled");
                    return Err(NetError::DialCanceled);
                }
                // Lost the race against either an accept or close.
                if delivered.try_recv().is_err() {
                    client.close_now();
                    return Err(NetError::ListenerClosed);
                }
            }
            Err(err) => {
                guard.disarm();
                client.close_now();
                return Err(err);
            }
        }

        tracing::debug!(conn = client.id(), peer = server_id, "dial connected");
        Ok(client)
    }

    /// Close the binder and every connection it handed out.
    ///
    /// Pending and future accepts and dials fail with
    /// [`NetError::ListenerClosed`]. Calling this again is a no-op.
    pub fn close(&self) -> Result<(), NetError> {
        let (registry, offers) = {
            let mut state = self.inner.lock_state();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            (std::mem::take(&mut state.registry), std::mem::take(&mut state.offers))
        };
        self.inner.incoming.notify_waiters();

        tracing::debug!(
            addr = %self.inner.addr,
            connections = registry.len(),
            pending = offers.len(),
            "closing binder"
        );
        for shared in registry.values() {
            shared.shut();
        }
        // Dropping the offers closes their server ends and fails their dialers.
        drop(offers);
        Ok(())
    }

    /// Create and register both ends of a new pipe. Caller holds the lock, so
    /// nothing here may drop a stream.
    fn bind_pair(&self, state: &mut State) -> (BoundStream, BoundStream) {
        let (client_io, server_io) = tokio::io::duplex(self.inner.pipe_capacity);
        let client_id = self.inner.next_id.fetch_add(2, Ordering::Relaxed);
        let server_id = client_id + 1;

        let client = self.bind(state, client_io, client_id, server_id);
        let server = self.bind(state, server_io, server_id, client_id);
        (client, server)
    }

    fn bind(
        &self,
        state: &mut State,
        io: tokio::io::DuplexStream,
        id: ConnId,
        peer_id: ConnId,
    ) -> BoundStream {
        let shared = Arc::new(ConnShared::default());
        state.registry.insert(id, shared.clone());

        let inner = Arc::clone(&self.inner);
        BoundStream::new(
            io,
            id,
            peer_id,
            self.inner.addr.clone(),
            shared,
            Box::new(move || inner.deregister(id)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_config_builder() {
        let config = BinderConfig::new().pipe_capacity(0).label("svc");
        assert_eq!(config.pipe_capacity, 1);
        let binder = Binder::with_config(config);
        assert_eq!(binder.addr().to_string(), "svc");
        assert_eq!(binder.inner.pipe_capacity, 1);
    }

    #[tokio::test]
    async fn test_pair_ids_are_linked() {
        let binder = Binder::new();
        let (client, server) = tokio::join!(binder.dial("pipe", ""), binder.accept());
        let (client, server) = (client.unwrap(), server.unwrap());

        assert_eq!(client.peer_id(), server.id());
        assert_eq!(server.peer_id(), client.id());
        assert_eq!(binder.connection_count(), 2);
    }

    #[tokio::test]
    async fn test_small_pipe_still_streams() {
        let binder = Binder::with_config(BinderConfig::new().pipe_capacity(4));
        let (client, server) = tokio::join!(binder.dial("pipe", ""), binder.accept());
        let (mut client, mut server) = (client.unwrap(), server.unwrap());

        let writer = tokio::spawn(async move {
            client.write_all(b"larger than four bytes").await.unwrap();
            client.close().await.unwrap();
        });
        let mut out = Vec::new();
        server.read_to_end(&mut out).await.unwrap();
        writer.await.unwrap();
        assert_eq!(out, b"larger than four bytes");
    }

    #[tokio::test]
    async fn test_withdraw_missing_offer() {
        let binder = Binder::new();
        assert!(!binder.inner.withdraw(42));
    }

    #[tokio::test]
    async fn test_dropped_dial_future_withdraws_offer() {
        let binder = Binder::new();
        {
            let dial = binder.dial("pipe", "");
            tokio::pin!(dial);
            // Poll once so the offer is queued, then drop the future.
            assert!(futures::poll!(dial.as_mut()).is_pending());
            assert_eq!(binder.pending_count(), 1);
            assert_eq!(binder.connection_count(), 2);
        }
        assert_eq!(binder.pending_count(), 0);
        assert_eq!(binder.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_close_took_offer() {
        let binder = Binder::new();
        let closer = binder.clone();
        // The cancel future closes the binder itself, so by the time the dial
        // tries to withdraw its offer, close has already taken it.
        let cancel = async move {
            closer.close().unwrap();
        };

        let err = binder.dial_context(cancel, "pipe", "").await.unwrap_err();
        assert_eq!(err, NetError::ListenerClosed);
        assert!(binder.is_closed());
        assert_eq!(binder.pending_count(), 0);
        assert_eq!(binder.connection_count(), 0);
    }
}
