//! Byte-for-byte report relay.
//!
//! No interpretation, no queuing, no backpressure: a report arriving
//! while the upstream endpoint is busy is dropped, which passthrough
//! mode prefers over blocking the event loop.

use crate::transport::ReportSink;

use super::state::PassthroughState;

impl PassthroughState {
    /// Forward one inbound report to the upstream side.
    ///
    /// Returns `true` when the report was handed to the sink. `false`
    /// means passthrough is off, the sink was not ready, or the sink
    /// rejected the write - in every case the report is gone.
    pub fn relay_report(&self, sink: &mut impl ReportSink, report: &[u8]) -> bool {
        if !self.is_enabled() {
            return false;
        }

        if !sink.ready() {
            debug!("passthrough: sink busy, dropping {} byte report", report.len());
            return false;
        }

        match sink.send(report) {
            Ok(()) => true,
            Err(e) => {
                warn!("passthrough: relay write failed: {}", e);
                false
            }
        }
    }
}
