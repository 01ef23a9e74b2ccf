//! Connection endpoints handed out by a [`Binder`](super::binder::Binder).
//!
//! A [`BoundStream`] owns one end of an in-memory duplex pipe. It behaves like
//! any other async stream, with two additions: closing it removes it from the
//! binder's registry, and the binder can force it closed from the outside when
//! the listener shuts down.

use crate::base::neterror::NetError;
use crate::socket::addr::PipeAddr;
use futures::task::AtomicWaker;
use hyper_util::client::legacy::connect::{Connected, Connection};
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};

/// Identity of one endpoint within a binder.
pub type ConnId = u64;

/// Callback run once when a stream leaves its binder's registry.
pub(crate) type Release = Box<dyn FnOnce() + Send + Sync>;

/// Close state shared between a stream and its binder's registry.
///
/// The binder keeps only this half, so it can fail pending and future I/O
/// without owning the stream itself.
#[derive(Default)]
pub(crate) struct ConnShared {
    closed: AtomicBool,
    read_waker: AtomicWaker,
    write_waker: AtomicWaker,
}

impl ConnShared {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark closed and wake any task parked in a read or write.
    /// Returns false if the stream was already closed.
    pub(crate) fn shut(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        self.read_waker.wake();
        self.write_waker.wake();
        first
    }
}

/// One end of a connected in-memory pair.
pub struct BoundStream {
    io: Option<DuplexStream>,
    id: ConnId,
    peer_id: ConnId,
    addr: PipeAddr,
    shared: Arc<ConnShared>,
    release: Option<Release>,
}

impl BoundStream {
    pub(crate) fn new(
        io: DuplexStream,
        id: ConnId,
        peer_id: ConnId,
        addr: PipeAddr,
        shared: Arc<ConnShared>,
        release: Release,
    ) -> Self {
        Self {
            io: Some(io),
            id,
            peer_id,
            addr,
            shared,
            release: Some(release),
        }
    }

    /// Identity of this endpoint.
    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Identity of the endpoint on the other side of the pipe.
    pub fn peer_id(&self) -> ConnId {
        self.peer_id
    }

    /// Address of the binder this stream belongs to.
    pub fn local_addr(&self) -> PipeAddr {
        self.addr.clone()
    }

    /// Same as [`local_addr`](Self::local_addr): both ends live on one binder.
    pub fn peer_addr(&self) -> PipeAddr {
        self.addr.clone()
    }

    /// True once this stream was closed locally or by its binder.
    pub fn is_closed(&self) -> bool {
        self.io.is_none() || self.shared.is_closed()
    }

    /// Close the stream, flushing the write side first so the peer reads EOF.
    ///
    /// The stream is deregistered and released before the shutdown is
    /// awaited, so dropping this future still leaves the stream closed.
    /// Closing twice is a no-op.
    pub async fn close(&mut self) -> io::Result<()> {
        let io = self.detach();
        match io {
            Some(mut io) => io.shutdown().await,
            None => Ok(()),
        }
    }

    /// Close the stream without waiting on the pipe.
    pub fn close_now(&mut self) {
        drop(self.detach());
    }

    fn detach(&mut self) -> Option<DuplexStream> {
        if let Some(release) = self.release.take() {
            release();
        }
        self.shared.shut();
        self.io.take()
    }

    fn live_io(&mut self) -> io::Result<&mut DuplexStream> {
        if self.shared.is_closed() {
            return Err(NetError::ConnectionClosed.into());
        }
        self.io.as_mut().ok_or_else(|| NetError::ConnectionClosed.into())
    }
}

impl Drop for BoundStream {
    fn drop(&mut self) {
        self.close_now();
    }
}

impl fmt::Debug for BoundStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundStream")
            .field("id", &self.id)
            .field("peer_id", &self.peer_id)
            .field("addr", &self.addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl AsyncRead for BoundStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        // Register before the closed check so a concurrent force-close cannot be missed.
        this.shared.read_waker.register(cx.waker());
        match this.live_io() {
            Ok(io) => Pin::new(io).poll_read(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

impl AsyncWrite for BoundStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.shared.write_waker.register(cx.waker());
        match this.live_io() {
            Ok(io) => Pin::new(io).poll_write(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match this.live_io() {
            Ok(io) => Pin::new(io).poll_flush(cx),
            // Nothing is buffered on our side once closed.
            Err(_) => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match this.live_io() {
            Ok(io) => Pin::new(io).poll_shutdown(cx),
            Err(_) => Poll::Ready(Ok(())),
        }
    }
}

// Implement hyper::rt::Read and hyper::rt::Write for BoundStream
// so hyper clients and servers can drive it without a TokioIo wrapper.
impl hyper::rt::Read for BoundStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        mut buf: hyper::rt::ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        // SAFETY: the unfilled region is only handed to tokio's ReadBuf, which
        // never de-initializes bytes.
        let unfilled = unsafe { buf.as_mut() };
        let mut read_buf = ReadBuf::uninit(unfilled);
        match AsyncRead::poll_read(self.as_mut(), cx, &mut read_buf) {
            Poll::Ready(Ok(())) => {
                let n = read_buf.filled().len();
                // SAFETY: ReadBuf reports exactly the `n` bytes it initialized.
                unsafe { buf.advance(n) };
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl hyper::rt::Write for BoundStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        <Self as AsyncWrite>::poll_write(self, cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        <Self as AsyncWrite>::poll_flush(self, cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        <Self as AsyncWrite>::poll_shutdown(self, cx)
    }
}

impl Connection for BoundStream {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}
