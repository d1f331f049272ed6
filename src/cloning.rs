//! Device identity cloning chain.
//!
//! When a peripheral attaches, the bridge reconstructs the identity it
//! will present upstream - VID/PID plus the three descriptive strings -
//! through four dependent descriptor fetches that must run in strict
//! order: device descriptor, then manufacturer, product and serial
//! strings. Each fetch is asynchronous; the transport calls back into
//! [`IdentityCloner`] with the result and the cloner issues the next
//! fetch from that callback. Nothing polls.
//!
//! Failure is asymmetric by design: VID/PID are load-bearing, so a
//! failed device-descriptor fetch aborts the whole attempt, while a
//! failed string fetch just leaves that string empty and moves on.
//! Either way the chain always terminates, and readers consult only
//! the terminal state through [`IdentityCloner::identity`].

use heapless::String;

use crate::config::{CLONED_STRING_CAP, USB_LANGID_EN_US};
use crate::descriptor::{decode_string_descriptor, DeviceDescriptor};
use crate::transport::{DescriptorFetcher, XferResult};

/// Stage of the cloning chain. Linear; no stage is ever re-entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CloneStage {
    /// No cloning attempt started for the current connection.
    Idle,
    /// Waiting for the device descriptor.
    DeviceDescriptor,
    /// Waiting for the manufacturer string.
    Manufacturer,
    /// Waiting for the product string.
    Product,
    /// Waiting for the serial string.
    Serial,
    /// Terminal. The identity fields are as good as they will get.
    Complete,
}

impl CloneStage {
    /// The string stage that follows this one.
    fn next_string_stage(self) -> CloneStage {
        match self {
            CloneStage::DeviceDescriptor => CloneStage::Manufacturer,
            CloneStage::Manufacturer => CloneStage::Product,
            CloneStage::Product => CloneStage::Serial,
            _ => CloneStage::Complete,
        }
    }
}

/// Identity reconstructed from the attached peripheral.
///
/// Fields may hold defaults when the corresponding fetch failed or the
/// device advertised no such string; that is only observable after the
/// chain completed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClonedIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: String<CLONED_STRING_CAP>,
    pub product: String<CLONED_STRING_CAP>,
    pub serial: String<CLONED_STRING_CAP>,
}

/// State machine driving the cloning chain for one connection.
///
/// Created (or reset) on disconnect, started once on the first HID
/// mount, advanced exclusively by the transport's completion events.
pub struct IdentityCloner {
    stage: CloneStage,
    device_address: u8,
    manufacturer_index: u8,
    product_index: u8,
    serial_index: u8,
    identity: ClonedIdentity,
}

impl IdentityCloner {
    pub fn new() -> Self {
        Self {
            stage: CloneStage::Idle,
            device_address: 0,
            manufacturer_index: 0,
            product_index: 0,
            serial_index: 0,
            identity: ClonedIdentity::default(),
        }
    }

    pub fn stage(&self) -> CloneStage {
        self.stage
    }

    /// Whether the chain has terminated (successfully or not).
    /// This is the only readiness signal.
    pub fn is_complete(&self) -> bool {
        self.stage == CloneStage::Complete
    }

    /// The cloned identity, available only once the chain terminated.
    /// Before that, fields would be partial and must not be trusted.
    pub fn identity(&self) -> Option<&ClonedIdentity> {
        if self.is_complete() {
            Some(&self.identity)
        } else {
            None
        }
    }

    /// Kick off the chain for the device at `addr`.
    ///
    /// Called once per connection, from the first HID mount event; a
    /// chain already in progress (or finished) is left alone. An
    /// issuance failure here is terminal, like any other stage-1
    /// failure: the identity stays at defaults and the chain completes.
    pub fn start(&mut self, addr: u8, fetcher: &mut impl DescriptorFetcher) {
        if self.stage != CloneStage::Idle {
            return;
        }

        self.device_address = addr;
        match fetcher.request_device_descriptor(addr) {
            Ok(()) => {
                self.stage = CloneStage::DeviceDescriptor;
                debug!("cloning: started for addr={}", addr);
            }
            Err(e) => {
                warn!("cloning: device descriptor request failed: {}", e);
                self.finish();
            }
        }
    }

    /// Completion of the stage-1 device descriptor fetch.
    ///
    /// On success, records VID/PID and the advertised string indices,
    /// then issues the first applicable string fetch. Any failure -
    /// transport error or a short descriptor - aborts the attempt.
    pub fn device_descriptor_complete(
        &mut self,
        result: XferResult,
        bytes: &[u8],
        fetcher: &mut impl DescriptorFetcher,
    ) {
        if self.stage != CloneStage::DeviceDescriptor {
            return;
        }

        if result != XferResult::Success {
            warn!("cloning: device descriptor fetch failed: {}", result);
            self.finish();
            return;
        }

        let Some(desc) = DeviceDescriptor::from_bytes(bytes) else {
            warn!("cloning: short device descriptor ({} bytes)", bytes.len());
            self.finish();
            return;
        };

        self.identity.vendor_id = desc.vendor_id();
        self.identity.product_id = desc.product_id();
        self.manufacturer_index = desc.manufacturer_index();
        self.product_index = desc.product_index();
        self.serial_index = desc.serial_index();

        debug!(
            "cloning: vid={:04x} pid={:04x}",
            self.identity.vendor_id,
            self.identity.product_id
        );

        self.request_string_from(CloneStage::Manufacturer, fetcher);
    }

    /// Completion of the string fetch belonging to the current stage.
    ///
    /// A failed or malformed string leaves its field empty; the chain
    /// advances regardless.
    pub fn string_complete(
        &mut self,
        result: XferResult,
        units: &[u16],
        fetcher: &mut impl DescriptorFetcher,
    ) {
        let stage = self.stage;
        let target = match stage {
            CloneStage::Manufacturer => &mut self.identity.manufacturer,
            CloneStage::Product => &mut self.identity.product,
            CloneStage::Serial => &mut self.identity.serial,
            _ => return,
        };

        if result == XferResult::Success {
            if let Some(decoded) = decode_string_descriptor::<CLONED_STRING_CAP>(units) {
                *target = decoded;
            }
        } else {
            warn!("cloning: string fetch failed at {}: {}", stage, result);
        }

        self.request_string_from(stage.next_string_stage(), fetcher);
    }

    /// Drop all cloned state, e.g. when the peripheral detaches.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Issue the fetch for the first stage at or after `stage` whose
    /// string index is advertised, skipping the rest. Falls through to
    /// completion when none remain. An issuance failure on a string is
    /// treated like a failed fetch: empty field, keep going.
    fn request_string_from(&mut self, stage: CloneStage, fetcher: &mut impl DescriptorFetcher) {
        let mut stage = stage;
        loop {
            let index = match stage {
                CloneStage::Manufacturer => self.manufacturer_index,
                CloneStage::Product => self.product_index,
                CloneStage::Serial => self.serial_index,
                _ => {
                    self.finish();
                    return;
                }
            };

            if index != 0 {
                match fetcher.request_string_descriptor(self.device_address, index, USB_LANGID_EN_US)
                {
                    Ok(()) => {
                        self.stage = stage;
                        return;
                    }
                    Err(e) => {
                        warn!("cloning: string request failed at {}: {}", stage, e);
                    }
                }
            }

            stage = stage.next_string_stage();
        }
    }

    fn finish(&mut self) {
        self.stage = CloneStage::Complete;
        debug!("cloning: complete");
    }
}

impl Default for IdentityCloner {
    fn default() -> Self {
        Self::new()
    }
}
