//! USB HID device presenting the bridged peripheral upstream.
//!
//! Initialises the Embassy USB stack on whatever driver the board layer
//! supplies and exposes a single HID endpoint whose identity (VID/PID,
//! strings) comes from the cloning chain and whose report descriptor is
//! the captured copy from the peripheral. Falls back to a generic
//! 3-button mouse when nothing was captured (e.g. passthrough disabled
//! or the peripheral vanished before enumeration finished).

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, ReportId, RequestHandler, State};
use embassy_usb::control::OutResponse;
use embassy_usb::driver::Driver;
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

use crate::bridge::Bridge;
use crate::cloning::ClonedIdentity;
use crate::config;
use crate::transport::{Clock, ControlPipe, ReportSink, ReportType, TransportError};

/// One relayed report frame, as queued between the host-side receive
/// callback and the USB writer task.
pub type RelayFrame = heapless::Vec<u8, 64>;

/// Depth of the relay channel. Frames beyond this are dropped, never
/// queued up - passthrough accepts loss over backpressure.
pub const RELAY_CHANNEL_DEPTH: usize = 16;

static HID_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static REPORT_DESC: StaticCell<[u8; config::HID_REPORT_DESCRIPTOR_CAP]> = StaticCell::new();
static IDENTITY: StaticCell<ClonedIdentity> = StaticCell::new();

/// Report descriptor presented when no capture is available: a plain
/// 3-button boot-protocol mouse with a scroll wheel.
const FALLBACK_MOUSE_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    0x05, 0x09, //     Usage Page (Buttons)
    0x19, 0x01, //     Usage Minimum (Button 1)
    0x29, 0x03, //     Usage Maximum (Button 3)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x95, 0x03, //     Report Count (3)
    0x75, 0x01, //     Report Size (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x95, 0x01, //     Report Count (1)
    0x75, 0x05, //     Report Size (5)
    0x81, 0x01, //     Input (Constant) - padding
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x09, 0x38, //     Usage (Wheel)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x03, //     Report Count (3)
    0x81, 0x06, //     Input (Data, Variable, Relative)
    0xC0, //   End Collection (Physical)
    0xC0, // End Collection (Application)
];

/// Millisecond clock backed by the Embassy time driver.
pub struct UptimeClock;

impl Clock for UptimeClock {
    fn now_ms(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }
}

/// Build result containing the USB device runner and the HID writer.
pub struct BridgeUsbDevice<D: Driver<'static>> {
    pub device: UsbDevice<'static, D>,
    pub writer: HidWriter<'static, D, 64>,
}

/// Initialise the USB stack and create the upstream HID device.
///
/// Must be called exactly once; all static buffers are consumed here.
/// `identity` is the cloned identity to present (fallbacks fill any
/// field cloning could not recover) and `report_descriptor` the
/// captured HID report descriptor, if any.
pub fn init<D: Driver<'static>>(
    driver: D,
    identity: &ClonedIdentity,
    report_descriptor: &[u8],
    request_handler: Option<&'static mut dyn RequestHandler>,
) -> BridgeUsbDevice<D> {
    let identity = IDENTITY.init(identity.clone());

    let vid = if identity.vendor_id != 0 {
        identity.vendor_id
    } else {
        config::FALLBACK_VID
    };
    let pid = if identity.product_id != 0 {
        identity.product_id
    } else {
        config::FALLBACK_PID
    };

    let mut usb_config = Config::new(vid, pid);
    usb_config.manufacturer = Some(if identity.manufacturer.is_empty() {
        config::FALLBACK_MANUFACTURER
    } else {
        identity.manufacturer.as_str()
    });
    usb_config.product = Some(if identity.product.is_empty() {
        config::FALLBACK_PRODUCT
    } else {
        identity.product.as_str()
    });
    usb_config.serial_number = Some(if identity.serial.is_empty() {
        config::FALLBACK_SERIAL
    } else {
        identity.serial.as_str()
    });
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    let desc_buf = REPORT_DESC.init([0u8; config::HID_REPORT_DESCRIPTOR_CAP]);
    let replayed: &'static [u8] = if report_descriptor.is_empty() {
        FALLBACK_MOUSE_DESCRIPTOR
    } else {
        let len = report_descriptor.len().min(desc_buf.len());
        desc_buf[..len].copy_from_slice(&report_descriptor[..len]);
        &desc_buf[..len]
    };

    let hid_state = HID_STATE.init(State::new());
    let hid_config = HidConfig {
        report_descriptor: replayed,
        request_handler,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 64,
    };
    let writer = HidWriter::new(&mut builder, hid_state, hid_config);

    let device = builder.build();

    info!("USB bridge device initialised, vid={:04x} pid={:04x}", vid, pid);

    BridgeUsbDevice { device, writer }
}

/// Relay sink writing into the frame channel toward the USB writer
/// task. A full channel drops the frame, it never blocks the host-side
/// receive callback.
pub struct ChannelSink {
    sender: Sender<'static, CriticalSectionRawMutex, RelayFrame, RELAY_CHANNEL_DEPTH>,
}

impl ChannelSink {
    pub fn new(
        sender: Sender<'static, CriticalSectionRawMutex, RelayFrame, RELAY_CHANNEL_DEPTH>,
    ) -> Self {
        Self { sender }
    }
}

impl ReportSink for ChannelSink {
    fn ready(&mut self) -> bool {
        !self.sender.is_full()
    }

    fn send(&mut self, report: &[u8]) -> Result<(), TransportError> {
        let mut frame = RelayFrame::new();
        frame
            .extend_from_slice(&report[..report.len().min(frame.capacity())])
            .ok();
        self.sender.try_send(frame).map_err(|_| TransportError::Busy)
    }
}

/// Host-initiated feature-report requests, proxied to the captured
/// peripheral through the control pipe.
///
/// Plugged into the HID class as its [`RequestHandler`]; while a
/// request is being proxied the bounded busy-wait in the proxy stalls
/// the event loop for up to 100 ms, which is the documented cost of
/// passthrough feature reports.
pub struct FeatureReportProxy<P: ControlPipe> {
    bridge: &'static RefCell<Bridge>,
    pipe: P,
    clock: UptimeClock,
}

impl<P: ControlPipe> FeatureReportProxy<P> {
    pub fn new(bridge: &'static RefCell<Bridge>, pipe: P) -> Self {
        Self {
            bridge,
            pipe,
            clock: UptimeClock,
        }
    }
}

fn split_report_id(id: ReportId) -> (u8, ReportType) {
    match id {
        ReportId::In(n) => (n, ReportType::Input),
        ReportId::Out(n) => (n, ReportType::Output),
        ReportId::Feature(n) => (n, ReportType::Feature),
    }
}

impl<P: ControlPipe> RequestHandler for FeatureReportProxy<P> {
    fn get_report(&mut self, id: ReportId, buf: &mut [u8]) -> Option<usize> {
        let (report_id, report_type) = split_report_id(id);
        let bridge = self.bridge.borrow();
        let len = bridge.passthrough.get_report(
            &mut self.pipe,
            &self.clock,
            0,
            report_id,
            report_type,
            buf,
            buf.len() as u16,
        );
        if len == 0 {
            None
        } else {
            Some(len as usize)
        }
    }

    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        let (report_id, report_type) = split_report_id(id);
        let bridge = self.bridge.borrow();
        if bridge
            .passthrough
            .set_report(&mut self.pipe, &self.clock, 0, report_id, report_type, data)
        {
            OutResponse::Accepted
        } else {
            OutResponse::Rejected
        }
    }
}

/// Run the USB device stack - must be spawned as a dedicated task.
pub async fn run_usb_device<D: Driver<'static>>(mut device: UsbDevice<'static, D>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Forwarding task: drains the relay channel into the HID endpoint.
pub async fn relay_writer_task<D: Driver<'static>>(
    mut writer: HidWriter<'static, D, 64>,
    rx: Receiver<'static, CriticalSectionRawMutex, RelayFrame, RELAY_CHANNEL_DEPTH>,
) -> ! {
    info!("relay writer task started - waiting for reports");

    loop {
        let frame = rx.receive().await;
        if let Err(_e) = writer.write(&frame).await {
            warn!("USB relay write failed");
        }
    }
}
