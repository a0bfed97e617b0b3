/// HID device management: discover force-feedback devices and write reports.
///
/// - Discovery filters by usage page / usage, plus VID/PID when configured
/// - Each loop opens its own handle by path and owns it until it exits
/// - Reports are plain 5-byte output reports written with `HidDevice::write`

use crate::config::HidConfig;
use crate::error::TransportError;
use crate::output::Report;
use crate::transport::{Transport, TransportOpener};
use hidapi::{HidApi, HidDevice};

/// A discovered device collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub product: Option<String>,
}

/// Characters of a device path shown in log lines.
const LOGGED_PATH_CHARS: usize = 60;

/// Leading part of a device path for log lines, cut on a char boundary.
pub fn short_path(path: &str) -> &str {
    match path.char_indices().nth(LOGGED_PATH_CHARS) {
        Some((end, _)) => &path[..end],
        None => path,
    }
}

/// Whether a collection passes the filter. Zero VID/PID match anything.
pub fn passes_filter(
    filter: &HidConfig,
    vendor_id: u16,
    product_id: u16,
    usage_page: u16,
    usage: u16,
) -> bool {
    if usage_page != filter.usage_page || usage != filter.usage {
        return false;
    }
    (filter.vendor_id == 0 || vendor_id == filter.vendor_id)
        && (filter.product_id == 0 || product_id == filter.product_id)
}

/// Every matching collection, in enumeration order.
pub fn find_devices(api: &HidApi, filter: &HidConfig) -> Vec<DeviceInfo> {
    let mut found = Vec::new();
    for dev in api.device_list() {
        let (vid, pid) = (dev.vendor_id(), dev.product_id());
        if !passes_filter(filter, vid, pid, dev.usage_page(), dev.usage()) {
            continue;
        }
        let path = dev.path().to_string_lossy().to_string();
        log::info!(
            "Found {vid:04X}:{pid:04X} {} at {}",
            dev.product_string().unwrap_or("<unnamed>"),
            short_path(&path)
        );
        found.push(DeviceInfo {
            path,
            vendor_id: vid,
            product_id: pid,
            product: dev.product_string().map(str::to_string),
        });
    }
    found
}

/// Opens HID devices by path. Each open gets its own API context so loops
/// never share one.
pub struct HidOpener;

impl TransportOpener for HidOpener {
    fn open(&self, path: &str) -> Result<Box<dyn Transport>, TransportError> {
        let cpath = std::ffi::CString::new(path.as_bytes())
            .map_err(|_| TransportError::InvalidPath(path.to_string()))?;
        let api = HidApi::new()?;
        let device = api.open_path(&cpath)?;
        Ok(Box::new(HidTransport { device, _api: api }))
    }
}

/// An open device. Dropping it closes the handle.
pub struct HidTransport {
    device: HidDevice,
    _api: HidApi,
}

impl Transport for HidTransport {
    fn send(&mut self, report: &Report) -> Result<(), TransportError> {
        self.device.write(report)?;
        Ok(())
    }
}
