//! Application-wide constants and compile-time configuration.
//!
//! All buffer capacities, timing parameters, and protocol constants
//! live here so they can be tuned in one place.

// Control-transfer proxy

/// Deadline for a proxied GET_REPORT/SET_REPORT control transfer (ms).
///
/// Generous slack above a typical control-transfer round trip, but small
/// enough to bound the worst-case stall of the single-threaded event
/// loop while the proxy busy-waits.
pub const CONTROL_XFER_TIMEOUT_MS: u64 = 100;

// Captured descriptors

/// Length of a standard USB device descriptor (bytes).
pub const DEVICE_DESCRIPTOR_LEN: usize = 18;

/// Capacity of the captured configuration descriptor buffer.
/// Longer descriptors are clamped, not rejected.
pub const CONFIG_DESCRIPTOR_CAP: usize = 256;

/// Capacity of the captured HID report descriptor buffer.
pub const HID_REPORT_DESCRIPTOR_CAP: usize = 512;

/// Maximum characters kept from a captured string descriptor.
pub const CAPTURED_STRING_CAP: usize = 63;

/// Maximum characters kept per cloned identity string.
pub const CLONED_STRING_CAP: usize = 31;

// USB protocol

/// Language ID used when requesting string descriptors (English, US).
pub const USB_LANGID_EN_US: u16 = 0x0409;

// Fallback identity
//
// Presented upstream when identity cloning never completed with usable
// values (e.g. the peripheral was unplugged mid-chain).  The
// "pid.codes" open-source test VID; replace with an allocated VID/PID
// for production.

pub const FALLBACK_VID: u16 = 0x1209;
pub const FALLBACK_PID: u16 = 0x0001;

pub const FALLBACK_MANUFACTURER: &str = "hidbridge";
pub const FALLBACK_PRODUCT: &str = "USB HID Bridge";
pub const FALLBACK_SERIAL: &str = "000001";

/// USB HID polling interval for the upstream-facing endpoint (ms).
pub const USB_HID_POLL_MS: u8 = 1;
