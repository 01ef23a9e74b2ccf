//! # memnet
//!
//! An in-memory network for running a server and its clients in one process.
//!
//! A [`Binder`] acts as both a listener and a dialer. Servers `accept()`
//! connections from it; clients `dial()` it. Each dial creates a fresh
//! in-memory duplex pipe and hands one end to the accepting side, so no OS
//! socket, port or address is ever involved.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use memnet::Binder;
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let binder = Binder::new();
//!
//!     let server = binder.clone();
//!     tokio::spawn(async move {
//!         let mut conn = server.accept().await.unwrap();
//!         conn.write_all(b"hello").await.unwrap();
//!     });
//!
//!     let mut conn = binder.dial("pipe", "memnet").await.unwrap();
//!     let mut buf = [0u8; 5];
//!     conn.read_exact(&mut buf).await.unwrap();
//!
//!     binder.close().unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions
//! - [`socket`] - The binder, its streams and the listener/dialer traits
//! - [`http`] - hyper connector and HTTP/1 server loop over a binder
//! - [`client`] - Pooled HTTP client dialing through a binder

pub mod base;
pub mod client;
pub mod http;
pub mod socket;

pub use base::neterror::NetError;
pub use client::{ClientConfig, HttpClient};
pub use socket::{Binder, BinderConfig, BoundStream, Dialer, Listener, PipeAddr};
