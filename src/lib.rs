//! USB-to-USB HID bridge core.
//!
//! The bridge sits between a host and a USB peripheral (typically a
//! mouse). Normally it remaps the peripheral's HID reports; in
//! passthrough mode it instead captures the peripheral's USB identity
//! and relays its traffic unmodified. This crate is the
//! transport-agnostic core of that firmware:
//!
//! - [`passthrough`] - descriptor capture, the synchronous
//!   GET_REPORT/SET_REPORT proxy, and the report relay.
//! - [`cloning`] - the ordered chain of descriptor fetches that
//!   reconstructs the peripheral's identity for upstream presentation.
//! - [`bridge`] - dispatch of the transport's mount/unmount/report
//!   events onto the above.
//! - [`transport`] - the trait boundary to the external USB host stack.
//!
//! Everything above runs on the host with `cargo test` against fake
//! transports and a fake clock; no embedded hardware is required. The
//! `embedded` feature adds the Embassy USB device-side presentation in
//! [`usb`].
//!
//! The firmware is single-threaded and cooperative: all state is
//! mutated from transport callbacks on one service thread, and the only
//! blocking operation anywhere is the proxy's bounded 100 ms wait.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod bridge;
pub mod cloning;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod passthrough;
pub mod transport;

#[cfg(feature = "embedded")]
pub mod usb;

pub use bridge::Bridge;
pub use cloning::{CloneStage, ClonedIdentity, IdentityCloner};
pub use descriptor::DeviceDescriptor;
pub use error::{Error, TransportError};
pub use passthrough::{PassthroughState, StringField};
