/// Device addressing: the controller drives exactly two devices.
///
/// The host addresses devices by external id. Ids 0 and 1 map directly;
/// id 2 is an alias the host uses for the first device.

use crate::error::EffectError;

/// Number of devices one controller can drive.
pub const MAX_DEVICES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIndex(u8);

impl DeviceIndex {
    pub const FIRST: DeviceIndex = DeviceIndex(0);
    pub const SECOND: DeviceIndex = DeviceIndex(1);
    pub const ALL: [DeviceIndex; MAX_DEVICES] = [DeviceIndex::FIRST, DeviceIndex::SECOND];

    /// Resolve an external device id.
    pub fn from_external(id: u32) -> Result<DeviceIndex, EffectError> {
        match id {
            0 | 2 => Ok(DeviceIndex::FIRST),
            1 => Ok(DeviceIndex::SECOND),
            _ => Err(EffectError::InvalidDevice(id)),
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// First byte of every report sent to this device.
    pub fn report_id(self) -> u8 {
        self.0 + 1
    }
}

impl std::fmt::Display for DeviceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "device {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_ids() {
        assert_eq!(DeviceIndex::from_external(0), Ok(DeviceIndex::FIRST));
        assert_eq!(DeviceIndex::from_external(1), Ok(DeviceIndex::SECOND));
        assert_eq!(DeviceIndex::from_external(2), Ok(DeviceIndex::FIRST));
        assert_eq!(DeviceIndex::from_external(3), Err(EffectError::InvalidDevice(3)));
    }

    #[test]
    fn report_ids_are_one_based() {
        assert_eq!(DeviceIndex::FIRST.report_id(), 1);
        assert_eq!(DeviceIndex::SECOND.report_id(), 2);
        assert_eq!(DeviceIndex::SECOND.index(), 1);
    }
}
