//! Force-feedback vibration controller for dual-motor HID devices.
//!
//! The host downloads effects into a small per-device slot table; a polling
//! loop per device combines the running effects and writes a 5-byte output
//! report whenever the combined intensity changes.

pub mod clock;
pub mod config;
pub mod controller;
pub mod device;
pub mod effect;
pub mod error;
pub mod hid;
pub mod mapper;
pub mod output;
pub mod rumble;
pub mod scheduler;
pub mod slots;
pub mod transport;

pub use controller::{ControllerSettings, FfCommand, VibrationController};
pub use device::DeviceIndex;
pub use effect::{EffectDescriptor, EffectDuration, EffectKind};
pub use error::{EffectError, TransportError};
