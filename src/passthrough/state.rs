//! Captured descriptor state for the currently bridged peripheral.
//!
//! One instance exists per powered-on bridge, constructed at startup
//! and mutated only from the transport's enumeration callbacks on the
//! single service thread. Descriptor content is copied verbatim and
//! replayed toward the host side without validation - the transport is
//! trusted to deliver well-formed descriptors.

use heapless::{String, Vec};

use crate::config::{CAPTURED_STRING_CAP, CONFIG_DESCRIPTOR_CAP, HID_REPORT_DESCRIPTOR_CAP};
use crate::descriptor::{decode_string_descriptor, DeviceDescriptor};

/// Destination field for a captured identity string.
///
/// USB string descriptor indices are device-assigned; mice conventionally
/// use 1/2/3 for manufacturer/product/serial and the numeric mapping is
/// confined to [`StringField::from_index`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StringField {
    Manufacturer,
    Product,
    Serial,
}

impl StringField {
    /// Map a string descriptor index to its conventional identity field.
    /// Any other index is not an identity string and is ignored.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(StringField::Manufacturer),
            2 => Some(StringField::Product),
            3 => Some(StringField::Serial),
            _ => None,
        }
    }
}

/// Captured USB identity of the bridged peripheral, plus the mode gate.
///
/// All capture setters no-op while the gate is off, and the proxy
/// refuses to run until a device address has been captured.
pub struct PassthroughState {
    enabled: bool,
    device_address: u8,
    interface_number: u8,
    device_descriptor: Option<DeviceDescriptor>,
    config_descriptor: Vec<u8, CONFIG_DESCRIPTOR_CAP>,
    hid_report_descriptor: Vec<u8, HID_REPORT_DESCRIPTOR_CAP>,
    manufacturer: String<CAPTURED_STRING_CAP>,
    product: String<CAPTURED_STRING_CAP>,
    serial: String<CAPTURED_STRING_CAP>,
    vendor_id: u16,
    product_id: u16,
}

impl PassthroughState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            device_address: 0,
            interface_number: 0,
            device_descriptor: None,
            config_descriptor: Vec::new(),
            hid_report_descriptor: Vec::new(),
            manufacturer: String::new(),
            product: String::new(),
            serial: String::new(),
            vendor_id: 0,
            product_id: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// USB address of the bridged peripheral; 0 until a device
    /// descriptor has been captured.
    pub fn device_address(&self) -> u8 {
        self.device_address
    }

    /// bInterfaceNumber the peripheral's HID interface lives on.
    pub fn interface_number(&self) -> u8 {
        self.interface_number
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn device_descriptor(&self) -> Option<&DeviceDescriptor> {
        self.device_descriptor.as_ref()
    }

    pub fn config_descriptor(&self) -> &[u8] {
        &self.config_descriptor
    }

    pub fn hid_report_descriptor(&self) -> &[u8] {
        &self.hid_report_descriptor
    }

    pub fn identity_string(&self, field: StringField) -> &str {
        match field {
            StringField::Manufacturer => &self.manufacturer,
            StringField::Product => &self.product,
            StringField::Serial => &self.serial,
        }
    }

    /// Record `addr` as the active device and copy its device
    /// descriptor verbatim.
    pub fn capture_device_descriptor(&mut self, addr: u8, desc: &DeviceDescriptor) {
        if !self.enabled {
            return;
        }

        self.device_address = addr;
        self.vendor_id = desc.vendor_id();
        self.product_id = desc.product_id();
        self.device_descriptor = Some(*desc);

        info!(
            "passthrough: captured device descriptor addr={} vid={:04x} pid={:04x}",
            addr,
            self.vendor_id,
            self.product_id
        );
    }

    /// Copy the configuration descriptor, clamping to local capacity.
    /// Truncation is logged, never surfaced to the caller.
    pub fn capture_config_descriptor(&mut self, addr: u8, bytes: &[u8]) {
        if !self.enabled {
            return;
        }

        let len = bytes.len().min(CONFIG_DESCRIPTOR_CAP);
        if bytes.len() > CONFIG_DESCRIPTOR_CAP {
            warn!(
                "passthrough: config descriptor too large ({} bytes), clamping to {}",
                bytes.len(),
                CONFIG_DESCRIPTOR_CAP
            );
        }

        self.config_descriptor.clear();
        // Cannot fail: len is clamped to capacity.
        let _ = self.config_descriptor.extend_from_slice(&bytes[..len]);

        debug!("passthrough: captured config descriptor addr={} len={}", addr, len);
    }

    /// Copy the HID report descriptor (same clamp policy) and record
    /// which interface it belongs to for later control requests.
    pub fn capture_hid_report_descriptor(&mut self, addr: u8, itf_num: u8, bytes: &[u8]) {
        if !self.enabled {
            return;
        }

        let len = bytes.len().min(HID_REPORT_DESCRIPTOR_CAP);
        if bytes.len() > HID_REPORT_DESCRIPTOR_CAP {
            warn!(
                "passthrough: HID report descriptor too large ({} bytes), clamping to {}",
                bytes.len(),
                HID_REPORT_DESCRIPTOR_CAP
            );
        }

        self.hid_report_descriptor.clear();
        let _ = self.hid_report_descriptor.extend_from_slice(&bytes[..len]);
        self.interface_number = itf_num;

        debug!(
            "passthrough: captured HID report descriptor addr={} itf={} len={}",
            addr,
            itf_num,
            len
        );
    }

    /// Decode and store an identity string descriptor.
    ///
    /// Malformed or empty descriptors and non-identity indices are
    /// silently ignored.
    pub fn capture_string_descriptor(&mut self, addr: u8, index: u8, units: &[u16]) {
        if !self.enabled {
            return;
        }

        let Some(field) = StringField::from_index(index) else {
            return;
        };
        let Some(decoded) = decode_string_descriptor::<CAPTURED_STRING_CAP>(units) else {
            return;
        };

        debug!(
            "passthrough: captured string[{}] addr={} len={}",
            index,
            addr,
            decoded.len()
        );

        match field {
            StringField::Manufacturer => self.manufacturer = decoded,
            StringField::Product => self.product = decoded,
            StringField::Serial => self.serial = decoded,
        }
    }

    /// Forget the captured address once the peripheral detaches.
    ///
    /// Descriptor copies are kept until overwritten by the next capture;
    /// only the address gate is cleared so the proxy stops issuing
    /// transfers against a stale device.
    pub fn device_disconnected(&mut self, addr: u8) {
        if self.device_address == addr && addr != 0 {
            self.device_address = 0;
            debug!("passthrough: device addr={} disconnected", addr);
        }
    }
}
