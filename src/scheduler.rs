/// Per-device polling loop: advances the slot table and pushes output on change.
///
/// One loop thread per device. Each iteration takes the controller lock, checks
/// the quit flag, advances the slots unless paused, and releases the lock
/// before sleeping for the poll interval. On exit the loop always sends a stop
/// report, then drops its transport.
///
/// Transport failures never reach callers. A device that cannot be opened runs
/// against a null transport; a failed write switches the loop to one for the
/// rest of its life.

use crate::clock::Tick;
use crate::controller::{ControllerSettings, Shared};
use crate::device::DeviceIndex;
use crate::error::TransportError;
use crate::output::{self, Intensity};
use crate::slots::SlotTable;
use crate::transport::{NullTransport, Transport, TransportOpener};
use std::sync::Arc;

/// Default tick period in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 10;

/// Loop-private output state for one device.
pub struct DeviceLoop {
    device: DeviceIndex,
    transport: Box<dyn Transport>,
    /// Last value handed to the transport.
    last_sent: Intensity,
    degraded: bool,
    dual_actuator: bool,
    infinite_cap_ms: Option<u64>,
}

impl DeviceLoop {
    /// Open the transport for `path`. A missing path or failed open is logged
    /// and replaced by a null transport.
    pub fn open(
        device: DeviceIndex,
        path: Option<&str>,
        opener: &dyn TransportOpener,
        settings: &ControllerSettings,
    ) -> Self {
        let opened = match path {
            Some(path) => opener.open(path),
            None => Err(TransportError::Unbound),
        };
        let (transport, degraded): (Box<dyn Transport>, bool) = match opened {
            Ok(transport) => {
                log::debug!("{device}: transport open");
                (transport, false)
            }
            Err(e) => {
                log::warn!("{device}: failed to open transport: {e}. Running without output.");
                (Box::new(NullTransport), true)
            }
        };

        Self {
            device,
            transport,
            last_sent: Intensity::ZERO,
            degraded,
            dual_actuator: settings.capabilities.dual_actuator,
            infinite_cap_ms: settings.infinite_cap_ms,
        }
    }

    /// Run one tick. Returns the combined output if it was pushed.
    pub fn tick(&mut self, slots: &mut SlotTable, now: Tick) -> Option<Intensity> {
        let combined = slots.advance(now, self.infinite_cap_ms);
        if combined == self.last_sent {
            return None;
        }
        let report = output::build_report(self.device, combined, self.dual_actuator);
        self.push(&report);
        self.last_sent = combined;
        Some(combined)
    }

    /// Send the stop report and release the transport.
    pub fn shutdown(mut self) {
        let report = output::build_stop_report(self.device);
        self.push(&report);
    }

    pub fn last_sent(&self) -> Intensity {
        self.last_sent
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn push(&mut self, report: &output::Report) {
        if let Err(e) = self.transport.send(report) {
            log::warn!("{}: write failed ({e}), dropping further output", self.device);
            self.transport = Box::new(NullTransport);
            self.degraded = true;
        }
    }
}

/// Thread body for one device. Exits when the device's quit flag is raised.
pub(crate) fn run(shared: Arc<Shared>, device: DeviceIndex, path: Option<String>) {
    let mut device_loop =
        DeviceLoop::open(device, path.as_deref(), shared.opener.as_ref(), &shared.settings);
    log::info!("{device}: vibration loop started");

    loop {
        {
            let mut state = shared.lock();
            let dev = &mut state.devices[device.index()];
            if dev.quit {
                break;
            }
            if !dev.paused {
                let now = shared.clock.now();
                if let Some(out) = device_loop.tick(&mut dev.slots, now) {
                    log::debug!("{device}: output {}/{} at tick {now}", out.small, out.big);
                }
            }
        }
        std::thread::sleep(shared.settings.poll_interval);
    }

    device_loop.shutdown();
    log::info!("{device}: vibration loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectKind;
    use crate::mapper::{ChannelUpdate, ChannelValue};
    use crate::transport::testing::RecordingOpener;
    use std::sync::atomic::Ordering;

    const PATH: &str = "hid#test";

    fn open_default(
        device: DeviceIndex,
        path: Option<&str>,
        opener: &RecordingOpener,
    ) -> DeviceLoop {
        DeviceLoop::open(device, path, opener, &ControllerSettings::default())
    }

    fn update(small: u8, big: u8) -> ChannelUpdate {
        ChannelUpdate {
            strength: small.max(big),
            channels: [ChannelValue::Set(small), ChannelValue::Set(big)],
        }
    }

    #[test]
    fn pushes_only_on_change() {
        let (opener, wire) = RecordingOpener::new();
        let mut dl = open_default(DeviceIndex::FIRST, Some(PATH), &opener);
        let mut slots = SlotTable::new();
        slots.download(EffectKind::CONSTANT_FORCE, &update(127, 0), 0, 0, Some(100)).unwrap();

        assert_eq!(dl.tick(&mut slots, 0), Some(Intensity::new(127, 0)));
        assert_eq!(dl.tick(&mut slots, 10), None);
        assert_eq!(dl.tick(&mut slots, 99), None);
        assert_eq!(dl.tick(&mut slots, 100), Some(Intensity::ZERO));
        assert_eq!(dl.tick(&mut slots, 110), None);

        assert_eq!(
            wire.reports_for(PATH),
            vec![[0x01, 0x01, 0x00, 127, 0], [0x01, 0x01, 0x00, 0, 0]]
        );
    }

    #[test]
    fn idle_table_sends_nothing() {
        let (opener, wire) = RecordingOpener::new();
        let mut dl = open_default(DeviceIndex::SECOND, Some(PATH), &opener);
        let mut slots = SlotTable::new();
        for now in 0..5 {
            assert_eq!(dl.tick(&mut slots, now * 10), None);
        }
        assert!(wire.reports_for(PATH).is_empty());
    }

    #[test]
    fn shutdown_sends_stop_and_releases() {
        let (opener, wire) = RecordingOpener::new();
        let dl = open_default(DeviceIndex::SECOND, Some(PATH), &opener);
        dl.shutdown();
        assert_eq!(wire.reports_for(PATH), vec![[0x02, 0x01, 0x00, 0, 0]]);
        assert_eq!(wire.released(), 1);
    }

    #[test]
    fn single_actuator_zeroes_channel_1() {
        let (opener, wire) = RecordingOpener::new();
        let mut settings = ControllerSettings::default();
        settings.capabilities.dual_actuator = false;
        let mut dl = DeviceLoop::open(DeviceIndex::FIRST, Some(PATH), &opener, &settings);
        let mut slots = SlotTable::new();
        slots.download(EffectKind::CONSTANT_FORCE, &update(80, 200), 0, 0, None).unwrap();
        dl.tick(&mut slots, 0);
        assert_eq!(wire.reports_for(PATH), vec![[0x01, 0x01, 0x00, 80, 0]]);
    }

    #[test]
    fn infinite_cap_bounds_run_time() {
        let (opener, wire) = RecordingOpener::new();
        let mut settings = ControllerSettings::default();
        settings.infinite_cap_ms = Some(50);
        let mut dl = DeviceLoop::open(DeviceIndex::FIRST, Some(PATH), &opener, &settings);
        let mut slots = SlotTable::new();
        slots.download(EffectKind::CONSTANT_FORCE, &update(100, 0), 0, 0, None).unwrap();

        assert!(dl.tick(&mut slots, 20).is_some());
        assert_eq!(dl.tick(&mut slots, 69), None);
        assert_eq!(dl.tick(&mut slots, 70), Some(Intensity::ZERO));
        assert_eq!(wire.reports_for(PATH).len(), 2);
    }

    #[test]
    fn open_failure_degrades_but_keeps_bookkeeping() {
        let (opener, wire) = RecordingOpener::new();
        wire.fail_open.store(true, Ordering::SeqCst);
        let mut dl = open_default(DeviceIndex::FIRST, Some(PATH), &opener);
        assert!(dl.is_degraded());

        let mut slots = SlotTable::new();
        slots.download(EffectKind::CONSTANT_FORCE, &update(50, 0), 0, 0, Some(10)).unwrap();
        dl.tick(&mut slots, 0);
        assert_eq!(dl.last_sent(), Intensity::new(50, 0));
        dl.tick(&mut slots, 10);
        assert!(!slots.slots()[0].active);
        assert!(wire.reports_for(PATH).is_empty());
    }

    #[test]
    fn missing_path_degrades() {
        let (opener, wire) = RecordingOpener::new();
        let dl = open_default(DeviceIndex::FIRST, None, &opener);
        assert!(dl.is_degraded());
        assert_eq!(wire.opened(), 0);
    }

    #[test]
    fn write_failure_switches_to_null_transport() {
        let (opener, wire) = RecordingOpener::new();
        let mut dl = open_default(DeviceIndex::FIRST, Some(PATH), &opener);
        assert_eq!(wire.opened(), 1);

        wire.fail_writes.store(true, Ordering::SeqCst);
        let mut slots = SlotTable::new();
        slots.download(EffectKind::CONSTANT_FORCE, &update(50, 0), 0, 0, Some(10)).unwrap();
        dl.tick(&mut slots, 0);
        assert!(dl.is_degraded());
        // The failed transport has been dropped.
        assert_eq!(wire.released(), 1);

        wire.fail_writes.store(false, Ordering::SeqCst);
        dl.tick(&mut slots, 10);
        dl.shutdown();
        assert!(wire.reports_for(PATH).is_empty());
    }
}
