/// Errors returned synchronously from effect download and device commands.
///
/// None of these are retried internally. Failures inside a polling loop
/// (hardware writes) never surface here; the loop degrades instead.

use crate::effect::EffectCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectError {
    /// The effect kind has no known category.
    UnknownEffect(u32),
    /// Envelope rejected: wrong size, or supplied to a category that takes none.
    InvalidParam(&'static str),
    /// Recognized category that this device cannot render.
    Unsupported(EffectCategory),
    /// No slot could be allocated.
    DeviceFull,
    /// A new effect would produce no output; nothing was queued.
    NoEffect,
    /// External device id outside the supported range.
    InvalidDevice(u32),
    /// The device's polling loop could not be started; the download was undone.
    LoopUnavailable,
}

impl EffectError {
    /// Advisory results are not failures from the host's point of view.
    pub fn is_advisory(self) -> bool {
        matches!(self, EffectError::NoEffect)
    }
}

impl std::fmt::Display for EffectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EffectError::UnknownEffect(id) => write!(f, "unknown effect kind 0x{id:04X}"),
            EffectError::InvalidParam(what) => write!(f, "invalid parameter: {what}"),
            EffectError::Unsupported(category) => {
                write!(f, "{category} effects are not supported")
            }
            EffectError::DeviceFull => f.write_str("no free effect slot"),
            EffectError::NoEffect => f.write_str("effect has no output"),
            EffectError::InvalidDevice(id) => write!(f, "invalid device id {id}"),
            EffectError::LoopUnavailable => f.write_str("vibration loop could not be started"),
        }
    }
}

impl std::error::Error for EffectError {}

/// Failure to open the hardware side of a device loop.
#[derive(Debug)]
pub enum TransportError {
    /// No handle path was bound to the device.
    Unbound,
    InvalidPath(String),
    Hid(hidapi::HidError),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Unbound => f.write_str("no device path bound"),
            TransportError::InvalidPath(path) => write!(f, "invalid device path: {path}"),
            TransportError::Hid(e) => write!(f, "HID error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Hid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        TransportError::Hid(e)
    }
}
