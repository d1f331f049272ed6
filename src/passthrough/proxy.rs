//! Synchronous GET_REPORT/SET_REPORT proxy over the asynchronous
//! control pipe.
//!
//! The host-facing feature-report handler needs an answer before its
//! own control transfer can complete, but the peripheral-facing channel
//! is callback-driven. The adapter between the two models is a bounded
//! busy-wait: submit the transfer, then repeatedly service the host
//! stack until the outcome arrives or 100 ms elapse. This is the only
//! place the firmware blocks; while it spins, nothing else runs, which
//! is acceptable only because the deadline is short.
//!
//! The pipe owns the single in-flight transfer, so the outcome is a
//! value returned from [`ControlPipe::poll`] rather than a shared slot;
//! GET and SET never alias each other's results.

use crate::config::CONTROL_XFER_TIMEOUT_MS;
use crate::error::Error;
use crate::transport::{
    Clock, ControlPipe, ReportType, SetupPacket, TransferOutcome, HID_REQ_GET_REPORT,
    HID_REQ_SET_REPORT, REQ_DIR_IN_CLASS_ITF, REQ_DIR_OUT_CLASS_ITF,
};

use super::state::PassthroughState;

/// Build a HID class/interface report request.
/// `wValue` packs the report type in the high byte and the ID below it.
fn report_request(
    bm_request_type: u8,
    b_request: u8,
    interface: u8,
    report_id: u8,
    report_type: ReportType,
    length: u16,
) -> SetupPacket {
    SetupPacket {
        bm_request_type,
        b_request,
        w_value: ((report_type as u16) << 8) | report_id as u16,
        w_index: interface as u16,
        w_length: length,
    }
}

/// Spin on the pipe until the in-flight transfer completes or the
/// deadline passes. The completion check runs before the deadline
/// check, so an outcome that arrives on the final service pass still
/// wins over the timeout.
fn wait_for_outcome(
    pipe: &mut impl ControlPipe,
    clock: &impl Clock,
) -> Result<TransferOutcome, Error> {
    let deadline = clock.now_ms().saturating_add(CONTROL_XFER_TIMEOUT_MS);
    loop {
        if let Some(outcome) = pipe.poll() {
            return Ok(outcome);
        }
        if clock.now_ms() >= deadline {
            return Err(Error::Timeout);
        }
    }
}

impl PassthroughState {
    /// Proxy a host GET_REPORT request to the captured peripheral.
    ///
    /// Returns the number of bytes received (possibly fewer than
    /// requested), or 0 when passthrough is off, no device is captured,
    /// the transfer could not be issued, it failed, or it timed out.
    /// The caller treats 0 as "not handled".
    pub fn get_report(
        &self,
        pipe: &mut impl ControlPipe,
        clock: &impl Clock,
        itf: u8,
        report_id: u8,
        report_type: ReportType,
        buffer: &mut [u8],
        requested_len: u16,
    ) -> u16 {
        if !self.is_enabled() || self.device_address() == 0 {
            return 0;
        }

        debug!(
            "passthrough: GET_REPORT itf={} id={} len={}",
            itf,
            report_id,
            requested_len
        );

        let setup = report_request(
            REQ_DIR_IN_CLASS_ITF,
            HID_REQ_GET_REPORT,
            self.interface_number(),
            report_id,
            report_type,
            requested_len,
        );

        let data_len = (requested_len as usize).min(buffer.len());
        if let Err(e) = pipe.submit_in(self.device_address(), setup, &mut buffer[..data_len]) {
            warn!("passthrough: GET_REPORT could not be issued: {}", e);
            return 0;
        }

        match wait_for_outcome(pipe, clock) {
            Ok(outcome) if outcome.is_success() => {
                debug!("passthrough: GET_REPORT complete, {} bytes", outcome.actual_len);
                outcome.actual_len
            }
            Ok(outcome) => {
                warn!("passthrough: GET_REPORT failed: {}", outcome.result);
                0
            }
            Err(_) => {
                warn!("passthrough: GET_REPORT timeout");
                0
            }
        }
    }

    /// Proxy a host SET_REPORT request to the captured peripheral.
    ///
    /// Returns `true` only on a transport-reported success; issuance
    /// failure, completion failure and timeout all collapse to `false`.
    pub fn set_report(
        &self,
        pipe: &mut impl ControlPipe,
        clock: &impl Clock,
        itf: u8,
        report_id: u8,
        report_type: ReportType,
        buffer: &[u8],
    ) -> bool {
        if !self.is_enabled() || self.device_address() == 0 {
            return false;
        }

        debug!(
            "passthrough: SET_REPORT itf={} id={} len={}",
            itf,
            report_id,
            buffer.len()
        );

        let setup = report_request(
            REQ_DIR_OUT_CLASS_ITF,
            HID_REQ_SET_REPORT,
            self.interface_number(),
            report_id,
            report_type,
            buffer.len() as u16,
        );

        if let Err(e) = pipe.submit_out(self.device_address(), setup, buffer) {
            warn!("passthrough: SET_REPORT could not be issued: {}", e);
            return false;
        }

        match wait_for_outcome(pipe, clock) {
            Ok(outcome) if outcome.is_success() => true,
            Ok(outcome) => {
                warn!("passthrough: SET_REPORT failed: {}", outcome.result);
                false
            }
            Err(_) => {
                warn!("passthrough: SET_REPORT timeout");
                false
            }
        }
    }
}
