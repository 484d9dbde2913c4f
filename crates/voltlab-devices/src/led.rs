//! LED device model: two-state conduction stamp plus the thermal/failure
//! state machine.
//!
//! Electrically an LED is solved iteratively: assume a conduction state,
//! solve, and flip the assumption until it is self-consistent (the solver
//! drives the loop, this module owns the stamp). Thermally it accumulates
//! energy under overstress and eventually explodes, with the explosion
//! delay drawn from a per-element seeded generator so identical snapshots
//! reproduce identical timing.

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tracing::debug;

use voltlab_core::{Computed, LedVisual, MnaSystem, NetId, NetIndexer, Runtime};

use crate::stamp::Stamp;

/// Rated continuous forward current, amperes.
pub const RATED_CURRENT: f64 = 0.020;
/// Rated power dissipation, watts.
pub const RATED_POWER: f64 = 0.080;
/// Reverse voltage beyond which the junction fails instantly, volts.
pub const REVERSE_BREAKDOWN: f64 = 50.0;
/// Drive magnitudes at or below this can never heat or explode the LED.
pub const LOW_VOLTAGE_GUARD: f64 = 2.2;
/// Overstress factor that skips thermal accumulation and fails instantly.
pub const HARD_OVERSTRESS_FACTOR: f64 = 1.2;
/// Thermal energy at which an explosion gets scheduled.
pub const EXPLOSION_ENERGY: f64 = 0.6;
/// Thermal energy above which brightness starts to flicker.
pub const FLICKER_ENERGY: f64 = 0.5;
/// Thermal energy ceiling.
pub const ENERGY_MAX: f64 = 2.0;

const HEAT_BASE_RATE: f64 = 0.05;
const HEAT_STRESS_RATE: f64 = 2.0;
const COOL_RATE: f64 = 0.35;
const EXPLOSION_DELAY_MIN: f64 = 0.200;
const EXPLOSION_DELAY_MAX: f64 = 0.300;

/// Consistency tolerances for the conduction-state iteration.
pub const CURRENT_EPS: f64 = 1e-6;
pub const VOLTAGE_EPS: f64 = 1e-6;

/// LED conduction stamp for one tick.
///
/// Conducting: an ideal `vf` source whose branch current is the forward
/// current (must solve non-negative). Blocking: no stamp beyond the
/// system-wide GMIN shunt, and the forward voltage must solve below `vf`.
#[derive(Debug, Clone)]
pub struct Led {
    pub anode: NetId,
    pub cathode: NetId,
    pub vf: f64,
    /// Current conduction assumption, flipped by the solver between
    /// re-stamps. Starts blocking: a false "off" is preferred over a
    /// false "on".
    pub conducting: bool,
}

impl Led {
    pub fn new(anode: NetId, cathode: NetId, vf: f64) -> Self {
        Self {
            anode,
            cathode,
            vf,
            conducting: false,
        }
    }

    /// Whether the solved operating point agrees with the current
    /// conduction assumption.
    pub fn consistent(&self, forward_voltage: f64, branch_current: Option<f64>) -> bool {
        if self.conducting {
            branch_current.unwrap_or(0.0) >= -CURRENT_EPS
        } else {
            forward_voltage <= self.vf + VOLTAGE_EPS
        }
    }
}

impl Stamp for Led {
    fn stamp(&self, mna: &mut MnaSystem, nets: &NetIndexer, branch: Option<usize>) {
        if self.conducting {
            if let Some(branch) = branch {
                mna.stamp_voltage(
                    nets.index(self.anode),
                    nets.index(self.cathode),
                    branch,
                    self.vf,
                );
            }
        }
    }

    fn num_branches(&self) -> usize {
        if self.conducting { 1 } else { 0 }
    }
}

/// Deterministic per-element seed (FNV-1a over the element id).
fn element_seed(id: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in id.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Evolve an LED's runtime state by `dt` seconds at monotonic time `now`.
///
/// `exploded` is terminal: once set it survives every subsequent tick and
/// only the external stop-simulation reset clears it.
pub fn advance(id: &str, prev: &Runtime, computed: &Computed, dt: f64, now: f64) -> Runtime {
    let (mut energy, mut explode_at, exploded) = match prev {
        Runtime::Led {
            energy,
            explode_at,
            exploded,
            ..
        } => (*energy, *explode_at, *exploded),
        _ => (0.0, None, false),
    };

    if exploded {
        return led_runtime(energy, explode_at, true, 0.0, LedVisual::Exploded);
    }

    // The guard and reverse rules judge the open-circuit drive at the
    // LED's position: a conducting junction pins its terminals near vf no
    // matter how hard the circuit pushes, so the clamped terminal voltage
    // says nothing about the source behind it.
    let drive = computed.drive.unwrap_or(computed.voltage);
    let amps = computed.current;
    let watts = computed.power;
    let forward = amps > 0.0;

    // A scheduled explosion fires unconditionally once its deadline
    // passes, even if the drive has since dropped.
    if let Some(deadline) = explode_at {
        if now >= deadline {
            debug!(element = id, "LED explosion deadline reached");
            return led_runtime(energy, explode_at, true, 0.0, LedVisual::Exploded);
        }
    }

    let guarded = drive.abs() <= LOW_VOLTAGE_GUARD;
    if !guarded {
        if drive < -REVERSE_BREAKDOWN {
            debug!(element = id, drive, "LED reverse breakdown");
            return led_runtime(energy, explode_at, true, 0.0, LedVisual::Exploded);
        }
        if forward
            && (amps >= HARD_OVERSTRESS_FACTOR * RATED_CURRENT
                || watts >= HARD_OVERSTRESS_FACTOR * RATED_POWER)
        {
            debug!(element = id, amps, watts, "LED hard overstress");
            return led_runtime(energy, explode_at, true, 0.0, LedVisual::Exploded);
        }

        let stress = stress_factor(amps, watts);
        if forward && stress > 0.0 {
            // Heat only builds while the LED is past its ratings; within
            // ratings it runs indefinitely.
            energy += (HEAT_BASE_RATE + stress * HEAT_STRESS_RATE) * dt;
        } else if !forward {
            energy -= COOL_RATE * dt;
        }
        energy = energy.clamp(0.0, ENERGY_MAX);

        if energy >= EXPLOSION_ENERGY && explode_at.is_none() {
            let mut rng = StdRng::seed_from_u64(element_seed(id));
            let delay = rng.random_range(EXPLOSION_DELAY_MIN..EXPLOSION_DELAY_MAX);
            debug!(element = id, delay, "LED explosion scheduled");
            explode_at = Some(now + delay);
        }
    } else if !forward {
        // The guard blocks heating but never cooling.
        energy = (energy - COOL_RATE * dt).max(0.0);
    }

    let mut brightness = (amps / RATED_CURRENT).clamp(0.0, 1.0);
    if energy > FLICKER_ENERGY && brightness > 0.0 {
        brightness *= flicker(id, now);
    }

    let visual = if !forward || brightness <= 0.0 {
        LedVisual::Off
    } else if stress_factor(amps, watts) > 0.0 || energy > FLICKER_ENERGY {
        LedVisual::Hot
    } else {
        LedVisual::On
    };

    led_runtime(energy, explode_at, false, brightness, visual)
}

/// Relative overstress above the rated limits, 0 when within ratings.
fn stress_factor(amps: f64, watts: f64) -> f64 {
    let current_stress = (amps - RATED_CURRENT) / RATED_CURRENT;
    let power_stress = (watts - RATED_POWER) / RATED_POWER;
    current_stress.max(power_stress).max(0.0)
}

/// Bounded sinusoid in [0.55, 1.0] keyed to the timestamp and the element
/// seed, so two hot LEDs don't flicker in lockstep.
fn flicker(id: &str, now: f64) -> f64 {
    let phase = (element_seed(id) % 628) as f64 / 100.0;
    0.775 + 0.225 * (now * 45.0 + phase).sin()
}

fn led_runtime(
    energy: f64,
    explode_at: Option<f64>,
    exploded: bool,
    brightness: f64,
    visual: LedVisual,
) -> Runtime {
    Runtime::Led {
        energy,
        explode_at,
        exploded,
        brightness,
        visual,
    }
}
