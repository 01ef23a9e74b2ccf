//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): error codes shared by the binder, its
//!   streams and the HTTP connector

pub mod neterror;
