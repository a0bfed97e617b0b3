//! Effect descriptors as issued by the host input subsystem.
//!
//! Effect kinds are the host-assigned ids registered for the device:
//!
//!   0x000 Constant       0x004 Triangle       0x008 Damper
//!   0x001 Ramp           0x005 Sawtooth Up    0x009 Inertia
//!   0x002 Square         0x006 Sawtooth Down  0x00A Friction
//!   0x003 Sine           0x007 Spring         0x100 Custom Force
//!
//! Magnitudes, gains and envelope levels use the nominal 0..10000 scale.
//! Times on the descriptor are in microseconds.

/// Nominal maximum for magnitudes, levels and gain.
pub const NOMINAL_MAX: u32 = 10_000;

/// Size of a well-formed envelope block, in bytes.
pub const ENVELOPE_SIZE: u32 = 20;

/// Actuator reference for the small (channel 0) motor.
pub const ACTUATOR_SMALL: u32 = 0x0100_0002;
/// Actuator reference for the big (channel 1) motor.
pub const ACTUATOR_BIG: u32 = 0x0100_0102;

/// Host-assigned effect kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectKind(pub u32);

impl EffectKind {
    pub const CONSTANT_FORCE: EffectKind = EffectKind(0x0000);
    pub const RAMP_FORCE: EffectKind = EffectKind(0x0001);
    pub const SQUARE: EffectKind = EffectKind(0x0002);
    pub const SINE: EffectKind = EffectKind(0x0003);
    pub const TRIANGLE: EffectKind = EffectKind(0x0004);
    pub const SAWTOOTH_UP: EffectKind = EffectKind(0x0005);
    pub const SAWTOOTH_DOWN: EffectKind = EffectKind(0x0006);
    pub const SPRING: EffectKind = EffectKind(0x0007);
    pub const DAMPER: EffectKind = EffectKind(0x0008);
    pub const INERTIA: EffectKind = EffectKind(0x0009);
    pub const FRICTION: EffectKind = EffectKind(0x000A);
    pub const CUSTOM_FORCE: EffectKind = EffectKind(0x0100);

    /// Category for this kind, or None if the device never registered it.
    pub fn category(self) -> Option<EffectCategory> {
        match self {
            EffectKind::CONSTANT_FORCE => Some(EffectCategory::ConstantForce),
            EffectKind::RAMP_FORCE => Some(EffectCategory::RampForce),
            EffectKind::SQUARE
            | EffectKind::SINE
            | EffectKind::TRIANGLE
            | EffectKind::SAWTOOTH_UP
            | EffectKind::SAWTOOTH_DOWN => Some(EffectCategory::Periodic),
            EffectKind::SPRING
            | EffectKind::DAMPER
            | EffectKind::INERTIA
            | EffectKind::FRICTION => Some(EffectCategory::Condition),
            EffectKind::CUSTOM_FORCE => Some(EffectCategory::CustomForce),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::CONSTANT_FORCE => "Constant",
            EffectKind::RAMP_FORCE => "Ramp Force",
            EffectKind::SQUARE => "Square Wave",
            EffectKind::SINE => "Sine Wave",
            EffectKind::TRIANGLE => "Triangle Wave",
            EffectKind::SAWTOOTH_UP => "Sawtooth Up Wave",
            EffectKind::SAWTOOTH_DOWN => "Sawtooth Down Wave",
            EffectKind::SPRING => "Spring",
            EffectKind::DAMPER => "Damper",
            EffectKind::INERTIA => "Inertia",
            EffectKind::FRICTION => "Friction",
            EffectKind::CUSTOM_FORCE => "Custom Force",
            _ => "<invalid>",
        }
    }
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:04X})", self.name(), self.0)
    }
}

/// Broad effect family. Only constant force is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectCategory {
    ConstantForce,
    RampForce,
    Periodic,
    Condition,
    CustomForce,
}

impl std::fmt::Display for EffectCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EffectCategory::ConstantForce => "constant force",
            EffectCategory::RampForce => "ramp force",
            EffectCategory::Periodic => "periodic",
            EffectCategory::Condition => "condition",
            EffectCategory::CustomForce => "custom force",
        })
    }
}

/// Attack/fade envelope. Only the attack level is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Declared size of the block; anything but [`ENVELOPE_SIZE`] is malformed.
    pub size: u32,
    pub attack_level: u32,
    pub attack_time_us: u32,
    pub fade_level: u32,
    pub fade_time_us: u32,
}

impl Envelope {
    pub fn new(attack_level: u32, attack_time_us: u32, fade_level: u32, fade_time_us: u32) -> Self {
        Self {
            size: ENVELOPE_SIZE,
            attack_level,
            attack_time_us,
            fade_level,
            fade_time_us,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantForce {
    /// Signed magnitude, nominally -10000..=10000.
    pub magnitude: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampForce {
    pub start: i32,
    pub end: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periodic {
    pub magnitude: u32,
    pub offset: i32,
    pub phase: u32,
    pub period_us: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub offset: i32,
    pub positive_coefficient: i32,
    pub negative_coefficient: i32,
    pub positive_saturation: u32,
    pub negative_saturation: u32,
    pub dead_band: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomForce {
    pub channels: u32,
    pub sample_period_us: u32,
    pub samples: Vec<i32>,
}

/// Type-specific parameter block.
///
/// A block whose shape does not belong to the effect's category is treated as
/// an unrecognized structure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeParams {
    /// No type-specific block was supplied.
    #[default]
    None,
    Constant(ConstantForce),
    Ramp(RampForce),
    Periodic(Periodic),
    Condition(Condition),
    Custom(CustomForce),
}

/// Effect duration on the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectDuration {
    Micros(u64),
    Infinite,
}

/// Everything the host supplies when downloading an effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectDescriptor {
    pub params: TypeParams,
    pub envelope: Option<Envelope>,
    /// 0..=10000; values above the nominal max are clamped.
    pub gain: u32,
    /// Axis or actuator references, one per axis.
    pub axes: Vec<u32>,
    /// Direction per axis, same order as `axes`.
    pub directions: Vec<i32>,
    pub start_delay_us: u64,
    pub duration: EffectDuration,
}

impl EffectDescriptor {
    /// Constant force at full gain with no axes, starting immediately.
    pub fn constant(magnitude: i32, duration: EffectDuration) -> Self {
        Self {
            params: TypeParams::Constant(ConstantForce { magnitude }),
            envelope: None,
            gain: NOMINAL_MAX,
            axes: Vec::new(),
            directions: Vec::new(),
            start_delay_us: 0,
            duration,
        }
    }

    pub fn with_gain(mut self, gain: u32) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    /// Route explicitly to the given actuator references.
    pub fn with_actuators(mut self, actuators: &[u32]) -> Self {
        self.axes = actuators.to_vec();
        self.directions = vec![0; actuators.len()];
        self
    }

    /// Route by direction; axis references are plain axis indices.
    pub fn with_directions(mut self, directions: &[i32]) -> Self {
        self.axes = (0..directions.len() as u32).collect();
        self.directions = directions.to_vec();
        self
    }

    pub fn with_start_delay_us(mut self, delay: u64) -> Self {
        self.start_delay_us = delay;
        self
    }
}
