//! Raw USB descriptor accessors.
//!
//! The bridge never parses descriptors structurally - it replays them
//! verbatim - so this module only exposes the handful of fixed-offset
//! fields the cloning chain and the cache need, plus the string
//! descriptor decode shared by both.

use heapless::String;

use crate::config::DEVICE_DESCRIPTOR_LEN;

/// Verbatim copy of a standard 18-byte USB device descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceDescriptor {
    bytes: [u8; DEVICE_DESCRIPTOR_LEN],
}

impl DeviceDescriptor {
    /// Wrap a raw descriptor. Returns `None` when fewer than 18 bytes
    /// were delivered; content is otherwise trusted as-is.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < DEVICE_DESCRIPTOR_LEN {
            return None;
        }
        let mut copy = [0u8; DEVICE_DESCRIPTOR_LEN];
        copy.copy_from_slice(&bytes[..DEVICE_DESCRIPTOR_LEN]);
        Some(Self { bytes: copy })
    }

    pub fn as_bytes(&self) -> &[u8; DEVICE_DESCRIPTOR_LEN] {
        &self.bytes
    }

    fn u16_at(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    /// idVendor.
    pub fn vendor_id(&self) -> u16 {
        self.u16_at(8)
    }

    /// idProduct.
    pub fn product_id(&self) -> u16 {
        self.u16_at(10)
    }

    /// iManufacturer string index (0 = none advertised).
    pub fn manufacturer_index(&self) -> u8 {
        self.bytes[14]
    }

    /// iProduct string index (0 = none advertised).
    pub fn product_index(&self) -> u8 {
        self.bytes[15]
    }

    /// iSerialNumber string index (0 = none advertised).
    pub fn serial_index(&self) -> u8 {
        self.bytes[16]
    }
}

/// Decode a UTF-16 string descriptor into a bounded ASCII string.
///
/// `units[0]` carries the descriptor header (bLength in the low byte,
/// bDescriptorType in the high byte); the character count is derived
/// from bLength and clamped to `N` and to the units actually received.
/// Each code unit is narrowed to its low byte - device strings are
/// assumed ASCII-range, and non-ASCII content is corrupted rather than
/// rejected. Documented lossy behavior, not a bug.
///
/// Returns `None` when no header unit was received (malformed/empty
/// descriptors are ignored, not errors).
pub fn decode_string_descriptor<const N: usize>(units: &[u16]) -> Option<String<N>> {
    if units.is_empty() {
        return None;
    }

    let b_length = (units[0] & 0xFF) as usize;
    let chars = (b_length / 2)
        .saturating_sub(1)
        .min(N)
        .min(units.len() - 1);

    let mut out = String::new();
    for &unit in &units[1..1 + chars] {
        // Cannot overflow for ASCII input; a non-ASCII low byte that
        // no longer fits is silently dropped.
        let _ = out.push((unit & 0xFF) as u8 as char);
    }
    Some(out)
}
