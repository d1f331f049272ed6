//! Transport event dispatch.
//!
//! The host stack delivers mount, unmount and report events through
//! whatever callback mechanism the board layer uses; this module maps
//! them onto the passthrough cache, the cloning chain and the relay.
//! One [`Bridge`] exists per powered-on device and owns all volatile
//! state, so teardown on disconnect is a plain reset rather than a
//! sweep of globals.

use crate::cloning::IdentityCloner;
use crate::passthrough::PassthroughState;
use crate::transport::{DescriptorFetcher, MountEvent, ReportSink};

/// Top-level context tying the per-connection state machines together.
///
/// Descriptor and cloning completions go straight to the public
/// `passthrough` / `cloner` fields; only the events that touch more
/// than one component are dispatched here.
pub struct Bridge {
    pub passthrough: PassthroughState,
    pub cloner: IdentityCloner,
}

impl Bridge {
    pub fn new(passthrough_enabled: bool) -> Self {
        Self {
            passthrough: PassthroughState::new(passthrough_enabled),
            cloner: IdentityCloner::new(),
        }
    }

    /// A HID interface of the attached peripheral finished enumerating.
    ///
    /// Captures the interface's report descriptor for replay (gated on
    /// passthrough mode inside the cache) and triggers identity cloning.
    /// Cloning runs regardless of passthrough mode - the bridge always
    /// wants to present the peripheral's identity upstream - and the
    /// cloner ignores the trigger if a chain is already running for
    /// this connection.
    pub fn on_hid_mount(&mut self, event: &MountEvent<'_>, fetcher: &mut impl DescriptorFetcher) {
        info!(
            "bridge: HID mount addr={} itf={} vid={:04x} pid={:04x}",
            event.device_address,
            event.interface_number,
            event.vendor_id,
            event.product_id
        );

        self.passthrough.capture_hid_report_descriptor(
            event.device_address,
            event.interface_number,
            event.report_descriptor,
        );

        self.cloner.start(event.device_address, fetcher);
    }

    /// The peripheral (or one of its interfaces) detached.
    pub fn on_hid_unmount(&mut self, addr: u8, instance: u8) {
        info!("bridge: HID unmount addr={} instance={}", addr, instance);
        self.passthrough.device_disconnected(addr);
        self.cloner.reset();
    }

    /// An input report arrived from the peripheral. Empty reports are
    /// ignored; the rest go to the relay. Returns whether the report
    /// was forwarded.
    pub fn on_report(&mut self, sink: &mut impl ReportSink, report: &[u8]) -> bool {
        if report.is_empty() {
            return false;
        }
        self.passthrough.relay_report(sink, report)
    }
}
