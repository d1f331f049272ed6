//! Passthrough mode: capture the bridged peripheral's USB identity and
//! relay its traffic unmodified.
//!
//! In normal operation the bridge remaps HID reports and presents its
//! own identity upstream. With passthrough enabled it instead holds a
//! verbatim copy of the peripheral's descriptors ([`PassthroughState`]),
//! mediates host-initiated feature-report requests against the captured
//! device address (`proxy`), and forwards inbound reports byte-for-byte
//! (`relay`).
//!
//! Every operation in this module is an unconditional no-op while the
//! mode gate is off - a feature-state check, not an error path.

mod proxy;
mod relay;
mod state;

#[cfg(test)]
mod tests;

pub use state::{PassthroughState, StringField};
