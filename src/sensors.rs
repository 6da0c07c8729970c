//! Sensor seams
//!
//! Register-level drivers are out of scope; acquisition talks to two narrow
//! traits instead. A reading either succeeds or comes back not-a-number —
//! there is no richer failure model at this boundary.
//!
//! The host-side implementations here give the binary and tests working
//! collaborators without real hardware.

/// One environmental reading. Either channel may be NaN on a failed read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

/// One three-axis acceleration reading, in g
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MotionReading {
    /// A device sitting level: gravity on the vertical axis only
    pub fn at_rest() -> Self {
        Self { x: 0.0, y: 0.0, z: 1.0 }
    }

    /// Motion intensity with gravity cancelled on the vertical axis
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + (self.z - 1.0) * (self.z - 1.0)).sqrt()
    }
}

/// Temperature/humidity source
pub trait EnvironmentSensor {
    fn read(&mut self) -> EnvReading;
}

/// Three-axis accelerometer source
pub trait MotionSensor {
    fn read(&mut self) -> MotionReading;
}

/// Environment sensor that always fails. Exercises the last-known-value
/// fallback; also the stand-in when no hardware is attached.
pub struct NullEnvironment;

impl EnvironmentSensor for NullEnvironment {
    fn read(&mut self) -> EnvReading {
        EnvReading {
            temperature_c: f64::NAN,
            humidity_pct: f64::NAN,
        }
    }
}

/// Environment sensor returning the same reading forever
pub struct FixedEnvironment {
    reading: EnvReading,
}

impl FixedEnvironment {
    pub fn new(temperature_c: f64, humidity_pct: f64) -> Self {
        Self {
            reading: EnvReading {
                temperature_c,
                humidity_pct,
            },
        }
    }
}

impl EnvironmentSensor for FixedEnvironment {
    fn read(&mut self) -> EnvReading {
        self.reading
    }
}

/// Motion sensor cycling through a fixed schedule of readings.
///
/// The default schedule alternates rest with a burst of movement so a demo
/// run exercises the heart-rate ramp in both directions.
pub struct PatternMotion {
    schedule: Vec<MotionReading>,
    cursor: usize,
}

impl PatternMotion {
    pub fn new(schedule: Vec<MotionReading>) -> Self {
        Self { schedule, cursor: 0 }
    }

    /// 20 ticks of rest, then 10 ticks of a ~1 g lateral shake
    pub fn rest_and_burst() -> Self {
        let mut schedule = vec![MotionReading::at_rest(); 20];
        schedule.extend(vec![
            MotionReading { x: 0.8, y: 0.6, z: 1.0 };
            10
        ]);
        Self::new(schedule)
    }
}

impl MotionSensor for PatternMotion {
    fn read(&mut self) -> MotionReading {
        if self.schedule.is_empty() {
            return MotionReading::at_rest();
        }
        let reading = self.schedule[self.cursor];
        self.cursor = (self.cursor + 1) % self.schedule.len();
        reading
    }
}
