//! Signal acquisition
//!
//! Produces exactly one [`Sample`] per tick from two independent sources:
//! an environmental reading (physical sensor, or the simulation oscillator)
//! and a three-axis motion reading. Heart rate is synthesized from motion
//! intensity unless a manual override is set.

use crate::sensors::{EnvironmentSensor, MotionSensor};
use crate::types::{round1, round2, HrSource, LinkStatus, Sample};
use log::debug;

/// Heart rate the ramp settles on at rest
pub const RESTING_BPM: f64 = 70.0;

/// Motion intensity (g) above which the heart-rate ramp is active
pub const MOTION_ACTIVE_THRESHOLD: f64 = 0.2;

/// Per-tick ramp step while active
const ACTIVE_RAMP_STEP: f64 = 2.0;

/// Per-tick ramp step while resting
const REST_RAMP_STEP: f64 = 1.0;

/// Motion must be absent this long before the resting ramp engages
const REST_DELAY_MS: u64 = 10_000;

/// Seeds for the last-known environment fallback, used until the first
/// good read. Mid-range, below every alert threshold.
const SEED_TEMPERATURE_C: f64 = 36.5;
const SEED_HUMIDITY_PCT: f64 = 45.0;

/// Move `current` toward `target` by at most `step`, without overshoot
fn step_toward(current: f64, target: f64, step: f64) -> f64 {
    if (target - current).abs() <= step {
        target
    } else if target > current {
        current + step
    } else {
        current - step
    }
}

/// One simulated channel: ramps between a lower and an upper target at a
/// fixed per-tick step, clamped to physically plausible absolute bounds.
struct SimChannel {
    value: f64,
    step: f64,
    upper: f64,
    lower: f64,
    floor: f64,
    ceil: f64,
}

impl SimChannel {
    fn advance(&mut self, rising: bool) {
        let target = if rising { self.upper } else { self.lower };
        self.value = step_toward(self.value, target, self.step).clamp(self.floor, self.ceil);
    }

    fn at_target(&self, rising: bool) -> bool {
        let target = if rising { self.upper } else { self.lower };
        self.value == target
    }
}

/// Triangle-wave oscillator driving temperature, humidity and BPM across
/// both alert edges. Channels clamp at their target and wait; only when
/// all three have arrived does the direction flip.
struct Oscillator {
    temperature: SimChannel,
    humidity: SimChannel,
    bpm: SimChannel,
    rising: bool,
}

impl Oscillator {
    fn new() -> Self {
        Self {
            temperature: SimChannel {
                value: SEED_TEMPERATURE_C,
                step: 0.3,
                upper: 39.5,
                lower: 34.5,
                floor: 30.0,
                ceil: 45.0,
            },
            humidity: SimChannel {
                value: SEED_HUMIDITY_PCT,
                step: 2.0,
                upper: 90.0,
                lower: 15.0,
                floor: 0.0,
                ceil: 100.0,
            },
            bpm: SimChannel {
                value: RESTING_BPM,
                step: 3.0,
                upper: 135.0,
                lower: 45.0,
                floor: 30.0,
                ceil: 200.0,
            },
            rising: true,
        }
    }

    fn advance(&mut self) -> (f64, f64, f64) {
        self.temperature.advance(self.rising);
        self.humidity.advance(self.rising);
        self.bpm.advance(self.rising);

        if self.temperature.at_target(self.rising)
            && self.humidity.at_target(self.rising)
            && self.bpm.at_target(self.rising)
        {
            self.rising = !self.rising;
        }

        (self.temperature.value, self.humidity.value, self.bpm.value)
    }
}

/// Per-tick sample producer.
///
/// Owns the last-known environment values (NaN fallback), the heart-rate
/// ramp state and the sticky manual override.
pub struct SignalAcquisition {
    env: Box<dyn EnvironmentSensor>,
    motion: Box<dyn MotionSensor>,
    oscillator: Option<Oscillator>,
    last_temperature: f64,
    last_humidity: f64,
    current_bpm: f64,
    manual_bpm: Option<u16>,
    last_motion_ms: u64,
}

impl SignalAcquisition {
    pub fn new(
        env: Box<dyn EnvironmentSensor>,
        motion: Box<dyn MotionSensor>,
        simulation: bool,
    ) -> Self {
        Self {
            env,
            motion,
            oscillator: simulation.then(Oscillator::new),
            last_temperature: SEED_TEMPERATURE_C,
            last_humidity: SEED_HUMIDITY_PCT,
            current_bpm: RESTING_BPM,
            manual_bpm: None,
            last_motion_ms: 0,
        }
    }

    /// Pin the heart rate to a fixed value. Sticky until cleared.
    pub fn set_manual_bpm(&mut self, bpm: u16) {
        self.manual_bpm = Some(bpm);
    }

    /// Return to motion-derived heart rate
    pub fn clear_manual_bpm(&mut self) {
        self.manual_bpm = None;
    }

    pub fn manual_bpm(&self) -> Option<u16> {
        self.manual_bpm
    }

    /// Produce the tick's sample. `status` is the connectivity observed by
    /// the dispatch driver at capture time.
    pub fn sample(&mut self, now_ms: u64, status: LinkStatus, device_id: &str) -> Sample {
        let motion = self.motion.read();
        let intensity = motion.magnitude();

        let (temperature, humidity, sim_bpm) = match &mut self.oscillator {
            Some(oscillator) => {
                let (t, h, b) = oscillator.advance();
                (t, h, Some(b))
            }
            None => {
                let reading = self.env.read();
                if reading.temperature_c.is_nan() {
                    debug!("temperature read failed, keeping {}", self.last_temperature);
                } else {
                    self.last_temperature = reading.temperature_c;
                }
                if reading.humidity_pct.is_nan() {
                    debug!("humidity read failed, keeping {}", self.last_humidity);
                } else {
                    self.last_humidity = reading.humidity_pct;
                }
                (self.last_temperature, self.last_humidity, None)
            }
        };

        let (bpm, bpm_mode) = if let Some(manual) = self.manual_bpm {
            (manual, HrSource::Manual)
        } else if let Some(simulated) = sim_bpm {
            (simulated.round() as u16, HrSource::Auto)
        } else {
            self.step_heart_rate(now_ms, intensity);
            (self.current_bpm.round() as u16, HrSource::Auto)
        };

        Sample {
            timestamp: now_ms,
            temperature: round1(temperature),
            humidity: round1(humidity),
            bpm,
            movement: round2(intensity),
            device_id: device_id.to_string(),
            status,
            bpm_mode,
        }
    }

    /// Active: ramp ±2/tick toward clamp(70 + 30·intensity, 60, 150).
    /// Resting (no motion for 10 s): ramp 1/tick toward 70.
    /// In between: hold.
    fn step_heart_rate(&mut self, now_ms: u64, intensity: f64) {
        if intensity > MOTION_ACTIVE_THRESHOLD {
            self.last_motion_ms = now_ms;
            let target = (RESTING_BPM + 30.0 * intensity).clamp(60.0, 150.0);
            self.current_bpm = step_toward(self.current_bpm, target, ACTIVE_RAMP_STEP);
        } else if now_ms.saturating_sub(self.last_motion_ms) >= REST_DELAY_MS {
            self.current_bpm = step_toward(self.current_bpm, RESTING_BPM, REST_RAMP_STEP);
        }
    }
}
