//! In-memory sockets.
//!
//! - [`binder`]: the listener/dialer pair and its connection registry
//! - [`stream`]: connection endpoints handed out by a binder
//! - [`listener`]: `Listener` and `Dialer` capability traits
//! - [`addr`]: display-only binder address

pub mod addr;
pub mod binder;
pub mod listener;
pub mod stream;

pub use addr::PipeAddr;
pub use binder::{Binder, BinderConfig};
pub use listener::{Accepting, Cancel, Dialer, Dialing, Listener};
pub use stream::{BoundStream, ConnId};
