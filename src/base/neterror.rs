use std::io;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed")]
    ConnectionClosed,

    // Binder Errors
    #[error("Listener closed")]
    ListenerClosed,
    #[error("Dial canceled before the connection was accepted")]
    DialCanceled,

    #[error("Unknown error code: {0}")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            // Binder codes (custom range starting at -900)
            NetError::ListenerClosed => -900,
            NetError::DialCanceled => -901,
            NetError::Unknown(code) => *code,
        }
    }

    /// The `io::ErrorKind` this error surfaces as when it crosses an I/O boundary.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            NetError::ConnectionClosed => io::ErrorKind::NotConnected,
            NetError::ListenerClosed => io::ErrorKind::ConnectionAborted,
            NetError::DialCanceled => io::ErrorKind::Interrupted,
            NetError::Unknown(_) => io::ErrorKind::Other,
        }
    }

    /// Recover a `NetError` carried inside an `io::Error`, if any.
    pub fn from_io(err: &io::Error) -> Option<NetError> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<NetError>()).copied()
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -100 => NetError::ConnectionClosed,
            -900 => NetError::ListenerClosed,
            -901 => NetError::DialCanceled,
            _ => NetError::Unknown(code),
        }
    }
}

impl From<NetError> for io::Error {
    fn from(err: NetError) -> Self {
        io::Error::new(err.io_kind(), err)
    }
}
