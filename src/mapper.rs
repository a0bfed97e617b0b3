/// Intensity mapper: effect descriptor → per-actuator byte intensities.
///
/// Only constant force is rendered. The other categories are recognized so
/// their parameter blocks can be validated, then rejected as unsupported.
///
/// Magnitude source (constant force):
///   envelope present → attack level, clamped to 0..10000
///   otherwise        → |magnitude|, clamped to 0..10000
/// Gain scales the magnitude when below nominal max; zero gain silences.
/// The result is rescaled to 0..254 with rounding.
///
/// Channel routing:
///   Explicit (any axis names an actuator) → matched actuators get the value,
///     the others keep their current value (zero on a fresh slot).
///   Implicit (direction based):
///     1 axis  → negative: channel 0, positive: channel 1, zero: keep both
///     2+ axes → axis 0 gates both channels, axis 1 overrides channel 1

use crate::effect::{
    ACTUATOR_BIG, ACTUATOR_SMALL, ENVELOPE_SIZE, EffectCategory, EffectDescriptor, EffectKind,
    NOMINAL_MAX, TypeParams,
};
use crate::error::EffectError;

/// Highest byte sent to an actuator.
pub const MAX_INTENSITY: u8 = 254;

/// Device capability flags relevant to routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// False for single-motor devices: everything goes to channel 0.
    pub dual_actuator: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self { dual_actuator: true }
    }
}

/// What a download does to one channel of its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelValue {
    Set(u8),
    /// Leave the slot's current value; zero if the slot is not active.
    Keep,
}

/// Mapped result for one effect download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelUpdate {
    /// Scaled strength before routing.
    pub strength: u8,
    pub channels: [ChannelValue; 2],
}

impl ChannelUpdate {
    /// Resolve against the slot's current intensity (None if not active).
    pub fn resolve(&self, current: Option<(u8, u8)>) -> (u8, u8) {
        let (cur0, cur1) = current.unwrap_or((0, 0));
        let pick = |value: ChannelValue, cur: u8| match value {
            ChannelValue::Set(v) => v,
            ChannelValue::Keep => cur,
        };
        (pick(self.channels[0], cur0), pick(self.channels[1], cur1))
    }
}

/// Map a download to a channel update.
pub fn map_effect(
    kind: EffectKind,
    desc: &EffectDescriptor,
    caps: Capabilities,
) -> Result<ChannelUpdate, EffectError> {
    let category = kind.category().ok_or(EffectError::UnknownEffect(kind.0))?;

    if let Some(env) = &desc.envelope {
        if env.size != ENVELOPE_SIZE {
            log::debug!("Envelope size {} does not match {ENVELOPE_SIZE}", env.size);
            return Err(EffectError::InvalidParam("envelope size mismatch"));
        }
    }

    let magnitude = magnitude_for(category, desc)?;
    let strength = scale(magnitude, desc.gain);

    let channels = if caps.dual_actuator {
        route(desc, strength)
    } else {
        [ChannelValue::Set(strength), ChannelValue::Set(0)]
    };

    Ok(ChannelUpdate { strength, channels })
}

/// Map a download as if it landed on a fresh slot.
pub fn map(
    kind: EffectKind,
    desc: &EffectDescriptor,
    caps: Capabilities,
) -> Result<(u8, u8), EffectError> {
    map_effect(kind, desc, caps).map(|update| update.resolve(None))
}

fn magnitude_for(category: EffectCategory, desc: &EffectDescriptor) -> Result<u32, EffectError> {
    match (category, &desc.params) {
        (EffectCategory::ConstantForce, TypeParams::None) => Ok(0),
        (EffectCategory::ConstantForce, TypeParams::Constant(c)) => Ok(match &desc.envelope {
            Some(env) => env.attack_level.min(NOMINAL_MAX),
            None => c.magnitude.unsigned_abs().min(NOMINAL_MAX),
        }),
        (EffectCategory::RampForce, TypeParams::Ramp(_))
        | (EffectCategory::CustomForce, TypeParams::Custom(_))
        | (EffectCategory::Condition, TypeParams::Condition(_)) => {
            if desc.envelope.is_some() {
                return Err(EffectError::InvalidParam("category takes no envelope"));
            }
            Err(EffectError::Unsupported(category))
        }
        (EffectCategory::Periodic, TypeParams::Periodic(_)) => {
            Err(EffectError::Unsupported(category))
        }
        (_, params) => {
            log::debug!("Parameter block {params:?} does not match {category}");
            Err(EffectError::Unsupported(category))
        }
    }
}

/// Apply gain and rescale 0..10000 → 0..254, rounding to nearest.
fn scale(magnitude: u32, gain: u32) -> u8 {
    let gain = gain.min(NOMINAL_MAX);
    if magnitude == 0 || gain == 0 {
        return 0;
    }
    let magnitude = if gain != NOMINAL_MAX {
        magnitude * gain / NOMINAL_MAX
    } else {
        magnitude
    };
    let byte = (magnitude * MAX_INTENSITY as u32 + NOMINAL_MAX / 2) / NOMINAL_MAX;
    byte.min(MAX_INTENSITY as u32) as u8
}

fn route(desc: &EffectDescriptor, strength: u8) -> [ChannelValue; 2] {
    let explicit = desc
        .axes
        .iter()
        .any(|&axis| axis == ACTUATOR_SMALL || axis == ACTUATOR_BIG);

    if explicit {
        let small = desc.axes.contains(&ACTUATOR_SMALL);
        let big = desc.axes.contains(&ACTUATOR_BIG);
        return [
            if small { ChannelValue::Set(strength) } else { ChannelValue::Keep },
            if big { ChannelValue::Set(strength) } else { ChannelValue::Keep },
        ];
    }

    let direction = |i: usize| desc.directions.get(i).copied().unwrap_or(0);
    let gated = |on: bool| ChannelValue::Set(if on { strength } else { 0 });

    match desc.axes.len() {
        0 => [ChannelValue::Keep, ChannelValue::Keep],
        1 => match direction(0) {
            d if d < 0 => [ChannelValue::Set(strength), ChannelValue::Keep],
            d if d > 0 => [ChannelValue::Keep, ChannelValue::Set(strength)],
            _ => [ChannelValue::Keep, ChannelValue::Keep],
        },
        _ => {
            let on = direction(0) != 0;
            let mut channels = [gated(on), gated(on)];
            if desc.directions.len() > 1 {
                channels[1] = gated(direction(1) != 0);
            }
            channels
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{
        Condition, CustomForce, EffectDuration, Envelope, Periodic, RampForce,
    };

    const DUAL: Capabilities = Capabilities { dual_actuator: true };

    fn constant(magnitude: i32) -> EffectDescriptor {
        EffectDescriptor::constant(magnitude, EffectDuration::Micros(100_000))
    }

    #[test]
    fn half_magnitude_single_negative_axis_lands_on_channel_0() {
        let desc = constant(5000).with_directions(&[-1]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &desc, DUAL), Ok((127, 0)));
    }

    #[test]
    fn single_positive_axis_lands_on_channel_1() {
        let desc = constant(10_000).with_directions(&[1]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &desc, DUAL), Ok((0, 254)));
    }

    #[test]
    fn single_zero_axis_keeps_both() {
        let desc = constant(10_000).with_directions(&[0]);
        let update = map_effect(EffectKind::CONSTANT_FORCE, &desc, DUAL).unwrap();
        assert_eq!(update.channels, [ChannelValue::Keep, ChannelValue::Keep]);
        assert_eq!(update.resolve(Some((10, 20))), (10, 20));
        assert_eq!(update.resolve(None), (0, 0));
    }

    #[test]
    fn negative_magnitude_is_folded() {
        let desc = constant(-10_000).with_directions(&[-1]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &desc, DUAL), Ok((254, 0)));
    }

    #[test]
    fn magnitude_is_clamped_to_nominal_max() {
        let desc = constant(i32::MIN).with_directions(&[-1]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &desc, DUAL), Ok((254, 0)));
    }

    #[test]
    fn envelope_attack_level_overrides_magnitude() {
        let desc = constant(10_000)
            .with_envelope(Envelope::new(2500, 0, 0, 0))
            .with_directions(&[-1]);
        // 2500 * 254 / 10000 = 63.5 → 64
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &desc, DUAL), Ok((64, 0)));

        let loud = constant(0)
            .with_envelope(Envelope::new(50_000, 0, 0, 0))
            .with_directions(&[-1]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &loud, DUAL), Ok((254, 0)));
    }

    #[test]
    fn malformed_envelope_is_invalid() {
        let mut env = Envelope::new(1000, 0, 0, 0);
        env.size = 16;
        let desc = constant(5000).with_envelope(env);
        assert_eq!(
            map(EffectKind::CONSTANT_FORCE, &desc, DUAL),
            Err(EffectError::InvalidParam("envelope size mismatch"))
        );
    }

    #[test]
    fn gain_scales_before_conversion() {
        let desc = constant(10_000).with_gain(5000).with_directions(&[-1]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &desc, DUAL), Ok((127, 0)));
    }

    #[test]
    fn gain_zero_silences_everything() {
        for magnitude in [1, 5000, 10_000, -10_000] {
            let desc = constant(magnitude).with_gain(0).with_directions(&[1, 1]);
            assert_eq!(map(EffectKind::CONSTANT_FORCE, &desc, DUAL), Ok((0, 0)));
        }
    }

    #[test]
    fn gain_above_nominal_is_clamped() {
        let desc = constant(5000).with_gain(20_000).with_directions(&[-1]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &desc, DUAL), Ok((127, 0)));
    }

    #[test]
    fn explicit_actuators() {
        let both = constant(10_000).with_actuators(&[ACTUATOR_SMALL, ACTUATOR_BIG]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &both, DUAL), Ok((254, 254)));

        let big = constant(10_000).with_actuators(&[ACTUATOR_BIG, 0x1234]);
        let update = map_effect(EffectKind::CONSTANT_FORCE, &big, DUAL).unwrap();
        assert_eq!(update.channels, [ChannelValue::Keep, ChannelValue::Set(254)]);
        assert_eq!(update.resolve(Some((99, 1))), (99, 254));
        assert_eq!(update.resolve(None), (0, 254));
    }

    #[test]
    fn two_axes_gate_and_override() {
        let on = constant(10_000).with_directions(&[3, 0]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &on, DUAL), Ok((254, 0)));

        let both = constant(10_000).with_directions(&[-3, 7]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &both, DUAL), Ok((254, 254)));

        let off = constant(10_000).with_directions(&[0, 0]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &off, DUAL), Ok((0, 0)));

        let only_big = constant(10_000).with_directions(&[0, -2]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &only_big, DUAL), Ok((0, 254)));
    }

    #[test]
    fn single_actuator_device_uses_channel_0_only() {
        let caps = Capabilities { dual_actuator: false };
        let desc = constant(10_000).with_directions(&[1]);
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &desc, caps), Ok((254, 0)));
    }

    #[test]
    fn unknown_kind_is_rejected_first() {
        let mut desc = constant(5000);
        desc.envelope = Some(Envelope { size: 3, ..Envelope::new(0, 0, 0, 0) });
        assert_eq!(
            map(EffectKind(0x77), &desc, DUAL),
            Err(EffectError::UnknownEffect(0x77))
        );
    }

    #[test]
    fn recognized_categories_are_unsupported() {
        let mut desc = constant(0);
        desc.params = TypeParams::Periodic(Periodic {
            magnitude: 5000,
            offset: 0,
            phase: 0,
            period_us: 10_000,
        });
        assert_eq!(
            map(EffectKind::SINE, &desc, DUAL),
            Err(EffectError::Unsupported(EffectCategory::Periodic))
        );

        desc.params = TypeParams::Ramp(RampForce { start: 0, end: 10_000 });
        assert_eq!(
            map(EffectKind::RAMP_FORCE, &desc, DUAL),
            Err(EffectError::Unsupported(EffectCategory::RampForce))
        );

        desc.params = TypeParams::Custom(CustomForce {
            channels: 1,
            sample_period_us: 1000,
            samples: vec![1, 2, 3],
        });
        assert_eq!(
            map(EffectKind::CUSTOM_FORCE, &desc, DUAL),
            Err(EffectError::Unsupported(EffectCategory::CustomForce))
        );
    }

    #[test]
    fn envelope_on_condition_is_invalid() {
        let mut desc = constant(0).with_envelope(Envelope::new(1, 0, 0, 0));
        desc.params = TypeParams::Condition(Condition {
            offset: 0,
            positive_coefficient: 1,
            negative_coefficient: 1,
            positive_saturation: 10_000,
            negative_saturation: 10_000,
            dead_band: 0,
        });
        assert_eq!(
            map(EffectKind::SPRING, &desc, DUAL),
            Err(EffectError::InvalidParam("category takes no envelope"))
        );
    }

    #[test]
    fn periodic_with_well_formed_envelope_is_still_unsupported() {
        let mut desc = constant(0).with_envelope(Envelope::new(1, 0, 0, 0));
        desc.params = TypeParams::Periodic(Periodic {
            magnitude: 1,
            offset: 0,
            phase: 0,
            period_us: 1,
        });
        assert_eq!(
            map(EffectKind::SQUARE, &desc, DUAL),
            Err(EffectError::Unsupported(EffectCategory::Periodic))
        );
    }

    #[test]
    fn mismatched_block_is_unsupported() {
        let desc = constant(5000);
        assert_eq!(
            map(EffectKind::SINE, &desc, DUAL),
            Err(EffectError::Unsupported(EffectCategory::Periodic))
        );
    }

    #[test]
    fn constant_without_block_maps_to_zero() {
        let mut desc = constant(0).with_directions(&[-1]);
        desc.params = TypeParams::None;
        assert_eq!(map(EffectKind::CONSTANT_FORCE, &desc, DUAL), Ok((0, 0)));
    }
}
