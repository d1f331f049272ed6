//! Interface boundary to the external USB host transport.
//!
//! The bridge core never talks to hardware directly: enumeration,
//! endpoint scheduling and transfer execution live in the host stack,
//! which delivers events through these traits and plain data types.
//! Everything here is synchronous from the core's point of view; the
//! transport's own asynchrony surfaces as "submit now, observe the
//! outcome from a later [`ControlPipe::poll`] call".
//!
//! Keeping the boundary as traits lets the whole core run on the host
//! against fake transports and a fake clock.

use crate::error::TransportError;

// HID class control requests (HID 1.11, section 7.2)

pub const HID_REQ_GET_REPORT: u8 = 0x01;
pub const HID_REQ_SET_REPORT: u8 = 0x09;

/// bmRequestType: Device-to-Host | Class | Interface.
pub const REQ_DIR_IN_CLASS_ITF: u8 = 0xA1;
/// bmRequestType: Host-to-Device | Class | Interface.
pub const REQ_DIR_OUT_CLASS_ITF: u8 = 0x21;

/// HID report type, as encoded in the high byte of `wValue`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReportType {
    Input = 1,
    Output = 2,
    Feature = 3,
}

/// The 8-byte setup stage of a USB control transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub bm_request_type: u8,
    pub b_request: u8,
    pub w_value: u16,
    pub w_index: u16,
    pub w_length: u16,
}

/// Result code reported by the transport for a completed transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum XferResult {
    Success,
    Failed,
    Stalled,
}

/// Outcome of a single completed control transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferOutcome {
    pub result: XferResult,
    /// Bytes actually moved in the data phase (may be less than requested).
    pub actual_len: u16,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        self.result == XferResult::Success
    }
}

/// A control pipe toward the downstream peripheral.
///
/// At most one transfer may be in flight per pipe: a second `submit`
/// before the first outcome has been polled is a caller bug and the
/// transport is free to reject it with [`TransportError::Busy`].
pub trait ControlPipe {
    /// Start an IN (device-to-host) control transfer; the data phase
    /// reads into `data`. Returns `Err` when the transfer cannot even
    /// be queued.
    fn submit_in(
        &mut self,
        addr: u8,
        setup: SetupPacket,
        data: &mut [u8],
    ) -> Result<(), TransportError>;

    /// Start an OUT (host-to-device) control transfer with `data` as
    /// the data phase.
    fn submit_out(
        &mut self,
        addr: u8,
        setup: SetupPacket,
        data: &[u8],
    ) -> Result<(), TransportError>;

    /// Service the host stack once, delivering pending completions.
    /// Returns the outcome of the in-flight transfer once it completes.
    fn poll(&mut self) -> Option<TransferOutcome>;
}

/// Monotonic millisecond clock, injected so the proxy's deadline is
/// testable without real time passing.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Asynchronous descriptor fetches used by the identity cloning chain.
/// Completions are delivered back by the transport's event handlers.
pub trait DescriptorFetcher {
    /// Request the 18-byte device descriptor of the device at `addr`.
    fn request_device_descriptor(&mut self, addr: u8) -> Result<(), TransportError>;

    /// Request string descriptor `index` in language `langid`.
    fn request_string_descriptor(
        &mut self,
        addr: u8,
        index: u8,
        langid: u16,
    ) -> Result<(), TransportError>;
}

/// Upstream-facing endpoint that relayed reports are written to.
pub trait ReportSink {
    /// Whether the endpoint can accept a report right now.
    fn ready(&mut self) -> bool;

    /// Queue one report for transmission.
    fn send(&mut self, report: &[u8]) -> Result<(), TransportError>;
}

/// Delivered by the transport when a HID interface of a newly attached
/// peripheral has been enumerated.
#[derive(Clone, Copy, Debug)]
pub struct MountEvent<'a> {
    pub device_address: u8,
    /// HID interface instance within the transport's bookkeeping.
    pub instance: u8,
    /// bInterfaceNumber of the HID interface, needed to address
    /// class control requests.
    pub interface_number: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    /// Raw HID report descriptor of the interface.
    pub report_descriptor: &'a [u8],
}
