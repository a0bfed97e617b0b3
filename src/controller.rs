/// Vibration controller: command surface, pause control and loop lifecycle.
///
/// All state for both devices sits behind one mutex. Commands hold it for a
/// single operation, loops hold it for a single tick. The only blocking call
/// besides the lock is the join performed when a device is reset.
///
/// Loop lifecycle per device:
///   first successful enqueue → slots cleared, loop spawned
///   reset / stop_all / bind  → quit raised, loop joined, transport released
///
/// Loops are also addressable by thread id, so teardown can be requested
/// with either a device index or the id of the loop thread.

use crate::clock::{Clock, MonotonicClock, Tick};
use crate::device::{DeviceIndex, MAX_DEVICES};
use crate::effect::{EffectDescriptor, EffectDuration, EffectKind};
use crate::error::EffectError;
use crate::hid::{self, HidOpener};
use crate::mapper::{self, Capabilities};
use crate::scheduler::{self, POLL_INTERVAL_MS};
use crate::slots::SlotTable;
use crate::transport::TransportOpener;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

/// Tunables shared by every loop of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    pub capabilities: Capabilities,
    /// Finite run time given to infinite effects when they start.
    pub infinite_cap_ms: Option<u64>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            capabilities: Capabilities::default(),
            infinite_cap_ms: None,
        }
    }
}

/// Force-feedback commands the host sends to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfCommand {
    Reset,
    StopAll,
    Pause,
    Continue,
    SetActuatorsOn,
    SetActuatorsOff,
}

/// Per-device state guarded by the controller lock.
#[derive(Default)]
pub(crate) struct Device {
    pub path: Option<String>,
    pub slots: SlotTable,
    pub paused: bool,
    pub paused_at: Tick,
    pub quit: bool,
    pub worker: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub(crate) struct State {
    pub devices: [Device; MAX_DEVICES],
    /// Loop thread → device it drives.
    pub loops: HashMap<ThreadId, DeviceIndex>,
}

pub(crate) struct Shared {
    state: Mutex<State>,
    pub clock: Arc<dyn Clock>,
    pub opener: Arc<dyn TransportOpener>,
    pub settings: ControllerSettings,
}

impl Shared {
    /// Take the controller lock. A poisoned lock is recovered: the state is
    /// plain data and every critical section leaves it consistent.
    pub fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct VibrationController {
    shared: Arc<Shared>,
}

impl VibrationController {
    pub fn new(
        settings: ControllerSettings,
        opener: Arc<dyn TransportOpener>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                clock,
                opener,
                settings,
            }),
        }
    }

    /// Controller writing to real HID devices on the monotonic clock.
    pub fn with_hid(settings: ControllerSettings) -> Self {
        Self::new(settings, Arc::new(HidOpener), Arc::new(MonotonicClock::new()))
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.shared.settings
    }

    /// Bind a device to its hardware path. Tears down any running loop; the
    /// next loop opens the new path.
    pub fn bind_device(&self, device: DeviceIndex, path: impl Into<String>) {
        let path = path.into();
        log::info!("{device}: bound to {}", hid::short_path(&path));
        self.shared.lock().devices[device.index()].path = Some(path);
        self.reset(device);
    }

    /// Download an effect. Mapping errors are returned before any slot is
    /// touched. The device's loop is started if it is not running; if it
    /// cannot be started the download is undone.
    pub fn enqueue(
        &self,
        device: DeviceIndex,
        kind: EffectKind,
        desc: &EffectDescriptor,
    ) -> Result<usize, EffectError> {
        let update = mapper::map_effect(kind, desc, self.shared.settings.capabilities).map_err(|e| {
            log::info!("{device}: rejected {kind}: {e}");
            e
        })?;
        let start_delay = desc.start_delay_us / 1000;
        let duration = match desc.duration {
            EffectDuration::Micros(us) => Some(us / 1000),
            EffectDuration::Infinite => None,
        };

        let mut state = self.shared.lock();
        let now = self.shared.clock.now();
        let running = state.devices[device.index()].worker.is_some();
        let dev = &mut state.devices[device.index()];
        if !running {
            // A stopped device starts from an empty table.
            dev.slots.clear();
        }
        let idx = dev.slots.download(kind, &update, now, start_delay, duration).map_err(|e| {
            log::debug!("{device}: {kind} not queued: {e}");
            e
        })?;
        log::debug!(
            "{device}: slot #{idx} ← {kind}, strength {}, delay {start_delay} ms, \
             duration {duration:?} ms",
            update.strength
        );
        if running {
            return Ok(idx);
        }
        let spawned = self.spawn_loop(&mut state, device);
        Self::settle_download(&mut state, device, idx, spawned)
    }

    /// Finish a download that had to start the loop. Without a loop nothing
    /// would ever play the slot, so the download is undone.
    fn settle_download(
        state: &mut State,
        device: DeviceIndex,
        idx: usize,
        spawned: Option<ThreadId>,
    ) -> Result<usize, EffectError> {
        match spawned {
            Some(_) => Ok(idx),
            None => {
                state.devices[device.index()].slots.clear();
                Err(EffectError::LoopUnavailable)
            }
        }
    }

    /// Expire every slot holding `kind`. The next tick retires them.
    pub fn stop_effect(&self, device: DeviceIndex, kind: EffectKind) {
        let mut state = self.shared.lock();
        let now = self.shared.clock.now();
        let stopped = state.devices[device.index()].slots.stop_effect(kind, now);
        log::debug!("{device}: stop {kind} ({stopped} slot(s))");
    }

    /// Expire every slot and tear the loop down. The loop sees quit before
    /// another tick, so its exit stop report is the only zero it pushes.
    pub fn stop_all(&self, device: DeviceIndex) {
        let worker = {
            let mut state = self.shared.lock();
            let now = self.shared.clock.now();
            let dev = &mut state.devices[device.index()];
            dev.slots.expire_all(now);
            Self::take_worker(&mut state, device)
        };
        log::info!("{device}: stop all");
        if let Some(worker) = worker {
            Self::join(device, worker);
        }
    }

    /// Freeze state advancement. Repeated calls keep the first reference tick.
    pub fn pause(&self, device: DeviceIndex) {
        let mut state = self.shared.lock();
        let now = self.shared.clock.now();
        let dev = &mut state.devices[device.index()];
        if dev.paused {
            log::debug!("{device}: already paused since tick {}", dev.paused_at);
            return;
        }
        dev.paused = true;
        dev.paused_at = now;
        log::info!("{device}: paused at tick {now}");
    }

    /// Resume advancement. Only deadlines already behind the pause tick are
    /// pushed forward by the pause duration.
    pub fn resume(&self, device: DeviceIndex) {
        let mut state = self.shared.lock();
        let now = self.shared.clock.now();
        let dev = &mut state.devices[device.index()];
        if !dev.paused {
            log::debug!("{device}: resume while not paused");
            return;
        }
        let delta = now.saturating_sub(dev.paused_at);
        let shifted = dev.slots.shift_expired(dev.paused_at, delta);
        dev.paused = false;
        log::info!(
            "{device}: resumed at tick {now} \
             (paused at {}, {shifted} deadline(s) shifted by {delta} ms)",
            dev.paused_at
        );
    }

    /// Stop the device's loop and wait for it to exit. No-op without a loop.
    pub fn reset(&self, device: DeviceIndex) {
        let worker = Self::take_worker(&mut self.shared.lock(), device);
        if let Some(worker) = worker {
            Self::join(device, worker);
        }
    }

    /// Reset whichever device the loop thread `id` drives. Unknown ids are
    /// ignored.
    pub fn reset_loop(&self, id: ThreadId) {
        let found = {
            let mut state = self.shared.lock();
            match state.loops.get(&id).copied() {
                Some(device) => Self::take_worker(&mut state, device).map(|w| (device, w)),
                None => None,
            }
        };
        match found {
            Some((device, worker)) => Self::join(device, worker),
            None => log::debug!("reset for unknown loop {id:?} ignored"),
        }
    }

    /// Start the device's loop if it is not running. Returns the loop's
    /// thread id, or None if the thread could not be spawned.
    pub fn start_loop_if_needed(&self, device: DeviceIndex) -> Option<ThreadId> {
        let mut state = self.shared.lock();
        if let Some(worker) = &state.devices[device.index()].worker {
            return Some(worker.thread().id());
        }
        state.devices[device.index()].slots.clear();
        self.spawn_loop(&mut state, device)
    }

    /// Actuators have no separate enable line.
    pub fn set_actuators(&self, device: DeviceIndex, on: bool) {
        log::debug!("{device}: actuators {} (ignored)", if on { "on" } else { "off" });
    }

    /// Route a host command addressed by external device id.
    pub fn send_command(&self, external_id: u32, command: FfCommand) -> Result<(), EffectError> {
        let device = DeviceIndex::from_external(external_id)?;
        log::debug!("{device}: command {command:?}");
        match command {
            FfCommand::Reset => self.reset(device),
            FfCommand::StopAll => self.stop_all(device),
            FfCommand::Pause => self.pause(device),
            FfCommand::Continue => self.resume(device),
            FfCommand::SetActuatorsOn => self.set_actuators(device, true),
            FfCommand::SetActuatorsOff => self.set_actuators(device, false),
        }
        Ok(())
    }

    pub fn is_running(&self, device: DeviceIndex) -> bool {
        self.shared.lock().devices[device.index()].worker.is_some()
    }

    pub fn is_paused(&self, device: DeviceIndex) -> bool {
        self.shared.lock().devices[device.index()].paused
    }

    /// Snapshot of the device's slot table.
    pub fn slots(&self, device: DeviceIndex) -> SlotTable {
        self.shared.lock().devices[device.index()].slots.clone()
    }

    /// Spawn the loop thread. Caller holds the lock; the new thread blocks on
    /// it until the caller releases.
    fn spawn_loop(&self, state: &mut State, device: DeviceIndex) -> Option<ThreadId> {
        let dev = &mut state.devices[device.index()];
        dev.quit = false;
        let shared = Arc::clone(&self.shared);
        let path = dev.path.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("vibration-{}", device.index()))
            .spawn(move || scheduler::run(shared, device, path));
        match spawned {
            Ok(handle) => {
                let id = handle.thread().id();
                dev.worker = Some(handle);
                state.loops.insert(id, device);
                Some(id)
            }
            Err(e) => {
                log::error!("{device}: failed to spawn vibration loop: {e}");
                None
            }
        }
    }

    /// Raise quit and detach the loop handle from the state.
    fn take_worker(state: &mut State, device: DeviceIndex) -> Option<JoinHandle<()>> {
        let dev = &mut state.devices[device.index()];
        let worker = dev.worker.take()?;
        dev.quit = true;
        state.loops.remove(&worker.thread().id());
        Some(worker)
    }

    fn join(device: DeviceIndex, worker: JoinHandle<()>) {
        if worker.thread().id() == std::thread::current().id() {
            // Requested from the loop itself: it exits on its next iteration.
            log::debug!("{device}: reset from own loop, not joining");
            return;
        }
        if worker.join().is_err() {
            log::error!("{device}: vibration loop panicked");
        }
    }
}

impl Drop for VibrationController {
    fn drop(&mut self) {
        for device in DeviceIndex::ALL {
            self.reset(device);
        }
    }
}
