//! Unified error type for hidbridge.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.
//!
//! Note that the public passthrough surface deliberately collapses every
//! failure into a zero/false return (see `passthrough::proxy`); these
//! types exist for the transport boundary and internal plumbing, nothing
//! here is ever propagated out of the core as a hard error.

/// Top-level error type used across the bridge core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The underlying USB host transport reported a failure.
    Transport(TransportError),

    /// A proxied control transfer did not complete within its deadline.
    Timeout,
}

/// Failures reported by the USB host transport when a transfer cannot
/// be started or completes unsuccessfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The transport rejected the request outright (could not be queued).
    Rejected,

    /// A transfer of this kind is already in flight on this pipe.
    Busy,

    /// The addressed device is no longer present.
    DeviceGone,
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}
