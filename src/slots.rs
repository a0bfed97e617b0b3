/// Effect slot table: fixed-capacity per-device effect records.
///
/// Allocation order for a download of kind K:
///   1. the slot already holding K (reuse)
///   2. the first inactive slot
///   3. the last slot, evicting whatever it held
///
/// Per tick, slots are advanced in index order:
///   inactive            → skipped
///   started, expired    → deactivated
///   started, running    → folded into the output (component-wise max)
///   not started, due    → started, stop deadline re-based to now + duration,
///                         folded into the output if still before its deadline

use crate::clock::Tick;
use crate::effect::EffectKind;
use crate::error::EffectError;
use crate::mapper::ChannelUpdate;
use crate::output::Intensity;

/// Slots per device.
pub const MAX_EFFECTS: usize = 5;

/// Absolute stop deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deadline {
    At(Tick),
    #[default]
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EffectSlot {
    /// None while the slot has never been assigned.
    pub effect: Option<EffectKind>,
    pub start: Tick,
    pub stop: Deadline,
    pub intensity: Intensity,
    pub active: bool,
    pub started: bool,
}

impl EffectSlot {
    /// Whether this slot feeds the device output at `now`.
    pub fn contributes(&self, now: Tick) -> bool {
        self.active
            && self.started
            && match self.stop {
                Deadline::Never => true,
                Deadline::At(stop) => now < stop,
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTable<const N: usize = MAX_EFFECTS> {
    slots: [EffectSlot; N],
}

impl<const N: usize> Default for SlotTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SlotTable<N> {
    pub fn new() -> Self {
        Self { slots: [EffectSlot::default(); N] }
    }

    pub fn slots(&self) -> &[EffectSlot] {
        &self.slots
    }

    pub fn get(&self, idx: usize) -> Option<&EffectSlot> {
        self.slots.get(idx)
    }

    /// Forget every slot.
    pub fn clear(&mut self) {
        self.slots = [EffectSlot::default(); N];
    }

    /// Pick the slot a download of `kind` lands in.
    pub fn allocate(&self, kind: EffectKind) -> Result<usize, EffectError> {
        if let Some(idx) = self.slots.iter().position(|s| s.effect == Some(kind)) {
            return Ok(idx);
        }
        if let Some(idx) = self.slots.iter().position(|s| !s.active) {
            return Ok(idx);
        }
        N.checked_sub(1).ok_or(EffectError::DeviceFull)
    }

    /// Queue a mapped download. Times are in milliseconds; `duration` None
    /// means the effect runs until stopped.
    pub fn download(
        &mut self,
        kind: EffectKind,
        update: &ChannelUpdate,
        now: Tick,
        start_delay: u64,
        duration: Option<u64>,
    ) -> Result<usize, EffectError> {
        let idx = self.allocate(kind)?;
        let slot = &mut self.slots[idx];
        let same_effect = slot.active && slot.effect == Some(kind);

        if update.strength == 0 {
            if !same_effect {
                return Err(EffectError::NoEffect);
            }
            if slot.started {
                log::debug!("Slot #{idx}: zero strength, stopping {kind}");
                slot.stop = Deadline::At(now);
            } else {
                log::debug!("Slot #{idx}: zero strength before start, dropping {kind}");
                slot.active = false;
            }
            return Ok(idx);
        }

        if slot.active && !same_effect {
            if let Some(evicted) = slot.effect {
                log::debug!("Slot #{idx}: evicting {evicted} for {kind}");
            }
        }

        let current = same_effect.then_some((slot.intensity.small, slot.intensity.big));
        let start = now.saturating_add(start_delay);
        *slot = EffectSlot {
            effect: Some(kind),
            start,
            stop: match duration {
                Some(ms) => Deadline::At(start.saturating_add(ms)),
                None => Deadline::Never,
            },
            intensity: update.resolve(current).into(),
            active: true,
            started: false,
        };
        Ok(idx)
    }

    /// Expire every slot holding `kind` at `now`. The next tick retires them.
    pub fn stop_effect(&mut self, kind: EffectKind, now: Tick) -> usize {
        let mut stopped = 0;
        for slot in self.slots.iter_mut().filter(|s| s.effect == Some(kind)) {
            slot.stop = Deadline::At(now);
            stopped += 1;
        }
        stopped
    }

    pub fn expire_all(&mut self, now: Tick) {
        for slot in &mut self.slots {
            slot.stop = Deadline::At(now);
        }
    }

    /// Push forward finite deadlines that were already behind `paused_at`.
    /// Deadlines at or after `paused_at` are left alone.
    pub fn shift_expired(&mut self, paused_at: Tick, delta: u64) -> usize {
        let mut shifted = 0;
        for (k, slot) in self.slots.iter_mut().enumerate() {
            if let Deadline::At(stop) = slot.stop {
                if stop < paused_at {
                    let shifted_stop = stop.saturating_add(delta);
                    log::debug!("Slot #{k}: stop deadline {stop} → {shifted_stop}");
                    slot.stop = Deadline::At(shifted_stop);
                    shifted += 1;
                }
            }
        }
        shifted
    }

    /// Advance every slot to `now` and return the combined output.
    ///
    /// `infinite_cap` gives infinite effects a finite run time from the
    /// moment they start.
    pub fn advance(&mut self, now: Tick, infinite_cap: Option<u64>) -> Intensity {
        let mut combined = Intensity::ZERO;

        for (k, slot) in self.slots.iter_mut().enumerate() {
            if !slot.active {
                continue;
            }

            if slot.started {
                match slot.stop {
                    Deadline::At(stop) if stop <= now => {
                        log::debug!("Slot #{k}: reached last tick, retiring");
                        slot.active = false;
                    }
                    _ => combined = combined.max(slot.intensity),
                }
                continue;
            }

            if slot.start > now {
                continue;
            }

            slot.started = true;
            slot.stop = match slot.stop {
                Deadline::At(stop) => {
                    Deadline::At(now.saturating_add(stop.saturating_sub(slot.start)))
                }
                Deadline::Never => match infinite_cap {
                    Some(cap) => Deadline::At(now.saturating_add(cap)),
                    None => Deadline::Never,
                },
            };

            if slot.contributes(now) {
                combined = combined.max(slot.intensity);
            } else {
                log::debug!("Slot #{k}: no run time left at start, retiring");
                slot.active = false;
            }
        }

        combined
    }
}
