/// Output report builder: combined channel intensities → raw HID bytes.
///
/// Report format (5 bytes, no CRC):
///   Byte 0: device index + 1
///   Byte 1: 0x01
///   Byte 2: 0x00
///   Byte 3: channel 0 (small motor)
///   Byte 4: channel 1 (big motor), always 0x00 on single-motor devices
///
/// The stop report has the same layout with both channel bytes zero.

use crate::device::DeviceIndex;

pub const REPORT_LEN: usize = 5;

pub type Report = [u8; REPORT_LEN];

/// Per-channel intensity pair, channel 0 first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Intensity {
    pub small: u8,
    pub big: u8,
}

impl Intensity {
    pub const ZERO: Intensity = Intensity { small: 0, big: 0 };

    pub fn new(small: u8, big: u8) -> Self {
        Self { small, big }
    }

    pub fn is_zero(self) -> bool {
        self.small == 0 && self.big == 0
    }

    /// Component-wise maximum.
    pub fn max(self, other: Intensity) -> Intensity {
        Intensity {
            small: self.small.max(other.small),
            big: self.big.max(other.big),
        }
    }
}

impl From<(u8, u8)> for Intensity {
    fn from((small, big): (u8, u8)) -> Self {
        Intensity { small, big }
    }
}

/// Build the report for a non-zero force.
pub fn build_force_report(device: DeviceIndex, force: Intensity, dual_actuator: bool) -> Report {
    let big = if dual_actuator { force.big } else { 0x00 };
    [device.report_id(), 0x01, 0x00, force.small, big]
}

pub fn build_stop_report(device: DeviceIndex) -> Report {
    [device.report_id(), 0x01, 0x00, 0x00, 0x00]
}

/// Pick the stop report for zero output, the force report otherwise.
pub fn build_report(device: DeviceIndex, force: Intensity, dual_actuator: bool) -> Report {
    if force.is_zero() {
        build_stop_report(device)
    } else {
        build_force_report(device, force, dual_actuator)
    }
}
