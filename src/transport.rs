/// Transport: the I/O boundary between a device loop and its hardware.
///
/// A transport is opened by the loop that owns it and dropped when the loop
/// exits; dropping it releases the hardware handle.

use crate::error::TransportError;
use crate::output::Report;

pub trait Transport {
    fn send(&mut self, report: &Report) -> Result<(), TransportError>;
}

/// Opens a transport from an opaque device path.
pub trait TransportOpener: Send + Sync {
    fn open(&self, path: &str) -> Result<Box<dyn Transport>, TransportError>;
}

/// Swallows every report. Used when the hardware is missing or has failed.
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&mut self, _report: &Report) -> Result<(), TransportError> {
        Ok(())
    }
}
