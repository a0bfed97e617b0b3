/// Test-pattern player: drives a device through a list of constant-force pulses.
///
/// Pulses share one effect kind, so each download replaces the previous one in
/// the same slot. A zero-magnitude pulse stops whatever is running (or is
/// reported as a no-op on an idle device) and acts as a pause.

use crate::config::{Channel, Pulse};
use crate::controller::VibrationController;
use crate::device::DeviceIndex;
use crate::effect::{ACTUATOR_BIG, ACTUATOR_SMALL, EffectDescriptor, EffectDuration, EffectKind};
use crate::error::EffectError;
use tokio::time::{sleep, Duration};

/// Effect descriptor for one pulse.
pub fn pulse_descriptor(pulse: &Pulse) -> EffectDescriptor {
    let actuators: &[u32] = match pulse.channel {
        Channel::Small => &[ACTUATOR_SMALL],
        Channel::Big => &[ACTUATOR_BIG],
        Channel::Both => &[ACTUATOR_SMALL, ACTUATOR_BIG],
    };
    EffectDescriptor::constant(pulse.magnitude, EffectDuration::Micros(pulse.duration_ms * 1000))
        .with_actuators(actuators)
        .with_start_delay_us(pulse.delay_ms * 1000)
}

/// Total wall time of a pattern.
pub fn pattern_length(pattern: &[Pulse]) -> Duration {
    Duration::from_millis(pattern.iter().map(|p| p.delay_ms + p.duration_ms).sum())
}

/// Play `pattern` on `device`, waiting out each pulse before the next.
/// Advisory rejections are skipped; anything else aborts the pattern.
pub async fn play_pattern(
    controller: &VibrationController,
    device: DeviceIndex,
    pattern: &[Pulse],
) -> Result<(), EffectError> {
    for pulse in pattern {
        match controller.enqueue(device, EffectKind::CONSTANT_FORCE, &pulse_descriptor(pulse)) {
            Ok(slot) => log::debug!(
                "{device}: pulse {} for {} ms in slot #{slot}",
                pulse.magnitude,
                pulse.duration_ms
            ),
            Err(e) if e.is_advisory() => log::debug!("{device}: pulse skipped: {e}"),
            Err(e) => return Err(e),
        }
        sleep(Duration::from_millis(pulse.delay_ms + pulse.duration_ms)).await;
    }
    // Always end with motors off
    controller.stop_effect(device, EffectKind::CONSTANT_FORCE);
    Ok(())
}
