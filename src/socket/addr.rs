//! Display-only address of a binder.

use std::fmt;
use std::sync::Arc;

/// Network name reported by every [`PipeAddr`].
pub const PIPE_NETWORK: &str = "pipe";

/// Default label rendered for a binder's address.
pub const DEFAULT_LABEL: &str = "memnet";

/// Self-identifying address of a [`Binder`](super::binder::Binder).
///
/// This is not a routable endpoint. Every dial reaches the same binder no
/// matter what address string is passed, so the value exists only so that
/// servers and logs have something to print.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PipeAddr {
    label: Arc<str>,
}

impl PipeAddr {
    pub(crate) fn new(label: impl Into<Arc<str>>) -> Self {
        Self { label: label.into() }
    }

    /// Name of the network, always `"pipe"`.
    #[inline]
    pub fn network(&self) -> &'static str {
        PIPE_NETWORK
    }

    /// The label this address renders as.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.label
    }
}

impl Default for PipeAddr {
    fn default() -> Self {
        PipeAddr::new(DEFAULT_LABEL)
    }
}

impl fmt::Debug for PipeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", PIPE_NETWORK, self.label)
    }
}

impl fmt::Display for PipeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.label, f)
    }
}
