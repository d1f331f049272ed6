//! Upstream-facing USB device glue (embedded builds only).
//!
//! Board bring-up - chip HAL selection, executor wiring, the PIO USB
//! host port - lives outside this crate; what this module provides is
//! the Embassy USB device that presents the cloned identity and the
//! captured descriptors to the host.

pub mod device;

pub use device::{init, relay_writer_task, run_usb_device, BridgeUsbDevice, ChannelSink,
                 FeatureReportProxy, RelayFrame, UptimeClock};
