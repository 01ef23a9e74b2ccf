//! HTTP over a binder.
//!
//! - [`connector`]: hyper-util connector that dials through a binder
//! - [`server`]: HTTP/1 accept loop for the server side

pub mod connector;
pub mod server;

// Re-exports for convenience
pub use connector::BinderConnector;
pub use server::serve_http1;
