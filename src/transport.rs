//! Byte transport between the host and the controller.

use std::time::Duration;

use log::{debug, info};
use rusb::{Context, Device, DeviceHandle, UsbContext};

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::protocol::{Report, ENDPOINT_IN, ENDPOINT_OUT, REPORT_SIZE};

/// Moves whole reports to and from the device.
///
/// [`UsbTransport`] is the real implementation. Tests substitute a recorder.
pub trait Transport {
    /// Write one report.
    fn write_report(&mut self, report: &Report) -> Result<()>;

    /// Read one report into `buf`, returning the number of bytes received.
    fn read_report(&mut self, buf: &mut Report) -> Result<usize>;
}

/// Interrupt-endpoint transport over libusb.
pub struct UsbTransport {
    handle: DeviceHandle<Context>,
    interface: u8,
    timeout: Duration,
}

impl UsbTransport {
    /// Open the first attached device matching the configured IDs and claim its interface.
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let context = Context::new()?;
        let device = find_device(&context, config.vendor_id, config.product_id)?.ok_or(
            Error::DeviceNotFound {
                vendor_id: config.vendor_id,
                product_id: config.product_id,
            },
        )?;

        let handle = device.open()?;

        // The HID class driver owns the interface on Linux
        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(e) => return Err(e.into()),
        }

        // Busy means a configuration is already active
        match handle.set_active_configuration(1) {
            Ok(()) | Err(rusb::Error::Busy) => {}
            Err(e) => return Err(e.into()),
        }

        handle.claim_interface(config.interface)?;

        info!(
            "Opened DLPC350 {:04x}:{:04x} at bus {} address {}",
            config.vendor_id,
            config.product_id,
            device.bus_number(),
            device.address()
        );

        Ok(Self {
            handle,
            interface: config.interface,
            timeout: config.timeout,
        })
    }
}

/// Find the first device with the given IDs.
fn find_device(
    context: &Context,
    vendor_id: u16,
    product_id: u16,
) -> Result<Option<Device<Context>>> {
    for device in context.devices()?.iter() {
        let Ok(descriptor) = device.device_descriptor() else {
            continue;
        };
        if descriptor.vendor_id() == vendor_id && descriptor.product_id() == product_id {
            return Ok(Some(device));
        }
    }
    Ok(None)
}

/// Count attached devices with the given IDs.
pub fn count_devices(vendor_id: u16, product_id: u16) -> Result<usize> {
    let context = Context::new()?;
    let count = context
        .devices()?
        .iter()
        .filter_map(|device| device.device_descriptor().ok())
        .filter(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
        .count();
    Ok(count)
}

impl Transport for UsbTransport {
    fn write_report(&mut self, report: &Report) -> Result<()> {
        let written = self
            .handle
            .write_interrupt(ENDPOINT_OUT, report, self.timeout)?;
        if written != REPORT_SIZE {
            return Err(Error::ShortWrite {
                written,
                expected: REPORT_SIZE,
            });
        }
        Ok(())
    }

    fn read_report(&mut self, buf: &mut Report) -> Result<usize> {
        Ok(self.handle.read_interrupt(ENDPOINT_IN, buf, self.timeout)?)
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        let _ = self.handle.release_interface(self.interface);
        // Leaves the controller ready for the next connection
        if let Err(e) = self.handle.reset() {
            debug!("USB reset on close failed: {e}");
        }
    }
}
