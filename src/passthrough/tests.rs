//! Unit tests for the descriptor cache, control-transfer proxy and
//! report relay, run on the host against fake transports.

use core::cell::Cell;

use crate::config::{CONFIG_DESCRIPTOR_CAP, HID_REPORT_DESCRIPTOR_CAP};
use crate::descriptor::DeviceDescriptor;
use crate::error::TransportError;
use crate::transport::{
    Clock, ControlPipe, ReportSink, ReportType, SetupPacket, TransferOutcome, XferResult,
};

use super::PassthroughState;

// Fakes

/// Control pipe with scripted completion behavior.
struct FakePipe {
    reject_submit: bool,
    /// Deliver the outcome on the n-th poll; `None` never completes.
    complete_on_poll: Option<u32>,
    outcome: TransferOutcome,
    /// Bytes the "device" returns in an IN data phase.
    fill: Vec<u8>,
    polls: u32,
    submitted: Vec<(u8, SetupPacket, Vec<u8>)>,
}

impl FakePipe {
    fn completing(result: XferResult, actual_len: u16) -> Self {
        Self {
            reject_submit: false,
            complete_on_poll: Some(1),
            outcome: TransferOutcome { result, actual_len },
            fill: Vec::new(),
            polls: 0,
            submitted: Vec::new(),
        }
    }

    fn silent() -> Self {
        Self {
            complete_on_poll: None,
            ..Self::completing(XferResult::Success, 0)
        }
    }
}

impl ControlPipe for FakePipe {
    fn submit_in(
        &mut self,
        addr: u8,
        setup: SetupPacket,
        data: &mut [u8],
    ) -> Result<(), TransportError> {
        if self.reject_submit {
            return Err(TransportError::Rejected);
        }
        let n = self.fill.len().min(data.len());
        data[..n].copy_from_slice(&self.fill[..n]);
        self.submitted.push((addr, setup, Vec::new()));
        Ok(())
    }

    fn submit_out(
        &mut self,
        addr: u8,
        setup: SetupPacket,
        data: &[u8],
    ) -> Result<(), TransportError> {
        if self.reject_submit {
            return Err(TransportError::Rejected);
        }
        self.submitted.push((addr, setup, data.to_vec()));
        Ok(())
    }

    fn poll(&mut self) -> Option<TransferOutcome> {
        self.polls += 1;
        match self.complete_on_poll {
            Some(n) if self.polls >= n => Some(self.outcome),
            _ => None,
        }
    }
}

/// Millisecond clock that advances by one tick per reading.
struct FakeClock {
    now: Cell<u64>,
}

impl FakeClock {
    fn new() -> Self {
        Self { now: Cell::new(0) }
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        let t = self.now.get();
        self.now.set(t + 1);
        t
    }
}

struct FakeSink {
    ready: bool,
    fail_send: bool,
    sent: Vec<Vec<u8>>,
}

impl FakeSink {
    fn new() -> Self {
        Self {
            ready: true,
            fail_send: false,
            sent: Vec::new(),
        }
    }
}

impl ReportSink for FakeSink {
    fn ready(&mut self) -> bool {
        self.ready
    }

    fn send(&mut self, report: &[u8]) -> Result<(), TransportError> {
        if self.fail_send {
            return Err(TransportError::Rejected);
        }
        self.sent.push(report.to_vec());
        Ok(())
    }
}

fn device_descriptor(vid: u16, pid: u16) -> DeviceDescriptor {
    let mut raw = [0u8; 18];
    raw[0] = 18;
    raw[1] = 0x01;
    raw[8..10].copy_from_slice(&vid.to_le_bytes());
    raw[10..12].copy_from_slice(&pid.to_le_bytes());
    DeviceDescriptor::from_bytes(&raw).unwrap()
}

fn string_units(s: &str) -> Vec<u16> {
    let mut units = vec![0x0300 | ((s.len() as u16 + 1) * 2)];
    units.extend(s.chars().map(|c| c as u16));
    units
}

/// Enabled state with a captured device at address 5, interface 1.
fn captured_state() -> PassthroughState {
    let mut state = PassthroughState::new(true);
    state.capture_device_descriptor(5, &device_descriptor(0x046D, 0xC52B));
    state.capture_hid_report_descriptor(5, 1, &[0x05, 0x01, 0x09, 0x02]);
    state
}

// Descriptor cache

#[test]
fn capture_rejected_while_mode_disabled() {
    let mut state = PassthroughState::new(false);

    state.capture_device_descriptor(5, &device_descriptor(0x046D, 0xC52B));
    state.capture_config_descriptor(5, &[9, 2, 34, 0]);
    state.capture_hid_report_descriptor(5, 1, &[0x05, 0x01]);
    state.capture_string_descriptor(5, 1, &string_units("Logitech"));

    assert_eq!(state.vendor_id(), 0);
    assert_eq!(state.product_id(), 0);
    assert_eq!(state.device_address(), 0);
    assert!(state.device_descriptor().is_none());
    assert!(state.config_descriptor().is_empty());
    assert!(state.hid_report_descriptor().is_empty());
    assert!(state.identity_string(super::StringField::Manufacturer).is_empty());
}

#[test]
fn capture_device_descriptor_records_identity() {
    let mut state = PassthroughState::new(true);
    state.capture_device_descriptor(5, &device_descriptor(0x046D, 0xC52B));

    assert_eq!(state.device_address(), 5);
    assert_eq!(state.vendor_id(), 0x046D);
    assert_eq!(state.product_id(), 0xC52B);
    assert_eq!(state.device_descriptor().unwrap().vendor_id(), 0x046D);
}

#[test]
fn config_descriptor_clamped_to_capacity() {
    let mut state = PassthroughState::new(true);
    let oversized = vec![0xAB; CONFIG_DESCRIPTOR_CAP + 40];
    state.capture_config_descriptor(5, &oversized);

    assert_eq!(state.config_descriptor().len(), CONFIG_DESCRIPTOR_CAP);
    assert!(state.config_descriptor().iter().all(|&b| b == 0xAB));
}

#[test]
fn hid_report_descriptor_clamped_and_interface_recorded() {
    let mut state = PassthroughState::new(true);
    let oversized = vec![0xCD; HID_REPORT_DESCRIPTOR_CAP + 1];
    state.capture_hid_report_descriptor(5, 2, &oversized);

    assert_eq!(state.hid_report_descriptor().len(), HID_REPORT_DESCRIPTOR_CAP);
    assert_eq!(state.interface_number(), 2);
}

#[test]
fn string_capture_dispatches_by_index() {
    let mut state = PassthroughState::new(true);
    state.capture_string_descriptor(5, 1, &string_units("Logitech"));
    state.capture_string_descriptor(5, 2, &string_units("G502"));
    state.capture_string_descriptor(5, 3, &string_units("0001"));

    assert_eq!(state.identity_string(super::StringField::Manufacturer), "Logitech");
    assert_eq!(state.identity_string(super::StringField::Product), "G502");
    assert_eq!(state.identity_string(super::StringField::Serial), "0001");
}

#[test]
fn string_capture_ignores_other_indices_and_empty_input() {
    let mut state = PassthroughState::new(true);
    state.capture_string_descriptor(5, 2, &string_units("G502"));

    state.capture_string_descriptor(5, 4, &string_units("ignored"));
    state.capture_string_descriptor(5, 0, &string_units("langids"));
    state.capture_string_descriptor(5, 2, &[]);

    assert_eq!(state.identity_string(super::StringField::Product), "G502");
}

#[test]
fn string_capture_is_idempotent() {
    let mut state = PassthroughState::new(true);
    let units = string_units("Logitech");
    state.capture_string_descriptor(5, 1, &units);
    let first = state.identity_string(super::StringField::Manufacturer).to_owned();
    state.capture_string_descriptor(5, 1, &units);

    assert_eq!(state.identity_string(super::StringField::Manufacturer), first);
}

#[test]
fn disconnect_clears_captured_address_only() {
    let mut state = captured_state();
    state.device_disconnected(9); // some other device
    assert_eq!(state.device_address(), 5);

    state.device_disconnected(5);
    assert_eq!(state.device_address(), 0);
    // Descriptors survive until the next capture overwrites them.
    assert!(!state.hid_report_descriptor().is_empty());
}

// Control-transfer proxy

#[test]
fn get_report_refused_without_device_address() {
    let state = PassthroughState::new(true);
    let mut pipe = FakePipe::completing(XferResult::Success, 8);
    let mut buf = [0u8; 8];

    let len = state.get_report(
        &mut pipe,
        &FakeClock::new(),
        0,
        4,
        ReportType::Feature,
        &mut buf,
        8,
    );
    assert_eq!(len, 0);
    assert!(pipe.submitted.is_empty());
}

#[test]
fn get_report_refused_while_mode_disabled() {
    let mut state = captured_state();
    state.set_enabled(false);
    let mut pipe = FakePipe::completing(XferResult::Success, 8);
    let mut buf = [0u8; 8];

    let len = state.get_report(
        &mut pipe,
        &FakeClock::new(),
        0,
        4,
        ReportType::Feature,
        &mut buf,
        8,
    );
    assert_eq!(len, 0);
    assert!(pipe.submitted.is_empty());
}

#[test]
fn get_report_builds_class_interface_request() {
    let state = captured_state();
    let mut pipe = FakePipe::completing(XferResult::Success, 4);
    pipe.fill = vec![0x11, 0x22, 0x33, 0x44];
    let mut buf = [0u8; 8];

    let len = state.get_report(
        &mut pipe,
        &FakeClock::new(),
        0,
        4,
        ReportType::Feature,
        &mut buf,
        8,
    );

    assert_eq!(len, 4);
    assert_eq!(&buf[..4], &[0x11, 0x22, 0x33, 0x44]);

    let (addr, setup, _) = &pipe.submitted[0];
    assert_eq!(*addr, 5);
    assert_eq!(setup.bm_request_type, 0xA1);
    assert_eq!(setup.b_request, 0x01);
    assert_eq!(setup.w_value, (3 << 8) | 4); // Feature report, ID 4
    assert_eq!(setup.w_index, 1); // captured interface, not the host's
    assert_eq!(setup.w_length, 8);
}

#[test]
fn get_report_issuance_failure_returns_zero_without_waiting() {
    let state = captured_state();
    let mut pipe = FakePipe::completing(XferResult::Success, 8);
    pipe.reject_submit = true;
    let mut buf = [0u8; 8];

    let len = state.get_report(
        &mut pipe,
        &FakeClock::new(),
        0,
        4,
        ReportType::Feature,
        &mut buf,
        8,
    );
    assert_eq!(len, 0);
    assert_eq!(pipe.polls, 0);
}

#[test]
fn get_report_transport_failure_returns_zero() {
    let state = captured_state();
    let mut pipe = FakePipe::completing(XferResult::Stalled, 0);
    let mut buf = [0u8; 8];

    let len = state.get_report(
        &mut pipe,
        &FakeClock::new(),
        0,
        4,
        ReportType::Feature,
        &mut buf,
        8,
    );
    assert_eq!(len, 0);
}

#[test]
fn get_report_times_out_after_deadline() {
    let state = captured_state();
    let mut pipe = FakePipe::silent();
    let mut buf = [0u8; 8];

    let len = state.get_report(
        &mut pipe,
        &FakeClock::new(),
        0,
        4,
        ReportType::Feature,
        &mut buf,
        8,
    );

    assert_eq!(len, 0);
    // One poll per elapsed millisecond until the 100 ms deadline.
    assert_eq!(pipe.polls, 100);
}

#[test]
fn get_report_completion_before_deadline_wins() {
    let state = captured_state();

    // Completion lands on the poll made as the clock reads 99 ms.
    let mut pipe = FakePipe::completing(XferResult::Success, 2);
    pipe.complete_on_poll = Some(99);
    let mut buf = [0u8; 8];
    let len = state.get_report(
        &mut pipe,
        &FakeClock::new(),
        0,
        4,
        ReportType::Feature,
        &mut buf,
        8,
    );
    assert_eq!(len, 2);

    // Even at the deadline itself the completion check runs first.
    let mut pipe = FakePipe::completing(XferResult::Success, 2);
    pipe.complete_on_poll = Some(100);
    let len = state.get_report(
        &mut pipe,
        &FakeClock::new(),
        0,
        4,
        ReportType::Feature,
        &mut buf,
        8,
    );
    assert_eq!(len, 2);
}

#[test]
fn set_report_success_forwards_payload() {
    let state = captured_state();
    let mut pipe = FakePipe::completing(XferResult::Success, 8);
    let payload = [0xAA; 8];

    let ok = state.set_report(&mut pipe, &FakeClock::new(), 0, 4, ReportType::Feature, &payload);
    assert!(ok);

    let (addr, setup, data) = &pipe.submitted[0];
    assert_eq!(*addr, 5);
    assert_eq!(setup.bm_request_type, 0x21);
    assert_eq!(setup.b_request, 0x09);
    assert_eq!(setup.w_value, (3 << 8) | 4);
    assert_eq!(setup.w_length, 8);
    assert_eq!(data, &payload);
}

#[test]
fn set_report_failure_and_timeout_return_false() {
    let state = captured_state();
    let payload = [0xAA; 8];

    let mut pipe = FakePipe::completing(XferResult::Failed, 0);
    assert!(!state.set_report(&mut pipe, &FakeClock::new(), 0, 4, ReportType::Feature, &payload));

    let mut pipe = FakePipe::silent();
    assert!(!state.set_report(&mut pipe, &FakeClock::new(), 0, 4, ReportType::Feature, &payload));

    let mut pipe = FakePipe::completing(XferResult::Success, 8);
    pipe.reject_submit = true;
    assert!(!state.set_report(&mut pipe, &FakeClock::new(), 0, 4, ReportType::Feature, &payload));
}

#[test]
fn set_report_refused_without_device_address() {
    let state = PassthroughState::new(true);
    let mut pipe = FakePipe::completing(XferResult::Success, 8);
    assert!(!state.set_report(&mut pipe, &FakeClock::new(), 0, 4, ReportType::Feature, &[0xAA]));
    assert!(pipe.submitted.is_empty());
}

// Report relay

#[test]
fn relay_forwards_reports_verbatim() {
    let state = captured_state();
    let mut sink = FakeSink::new();

    assert!(state.relay_report(&mut sink, &[1, 2, 3, 4]));
    assert_eq!(sink.sent, [vec![1, 2, 3, 4]]);
}

#[test]
fn relay_noops_while_mode_disabled() {
    let state = PassthroughState::new(false);
    let mut sink = FakeSink::new();

    assert!(!state.relay_report(&mut sink, &[1, 2, 3]));
    assert!(sink.sent.is_empty());
}

#[test]
fn relay_drops_report_when_sink_busy() {
    let state = captured_state();
    let mut sink = FakeSink::new();
    sink.ready = false;

    assert!(!state.relay_report(&mut sink, &[1, 2, 3]));
    assert!(sink.sent.is_empty());
}

#[test]
fn relay_reports_sink_write_failure() {
    let state = captured_state();
    let mut sink = FakeSink::new();
    sink.fail_send = true;

    assert!(!state.relay_report(&mut sink, &[1, 2, 3]));
}
