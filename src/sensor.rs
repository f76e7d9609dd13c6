//! Sensor abstraction with a simulator for development without hardware.

use parking_lot::Mutex;
use rand::Rng;

/// One raw measurement, before the log assigns an id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub co2: f64,
    pub temperature: f64,
    pub humidity: f64,
}

/// Sensor read errors
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Sensor read failed: {0}")]
    ReadFailed(String),
}

/// Source of air-quality measurements.
pub trait Sensor: Send + Sync {
    fn read(&self) -> Result<Measurement, SensorError>;
}

const SIM_CO2_MIN: f64 = 400.0;
const SIM_CO2_MAX: f64 = 2000.0;
const SIM_CO2_STEP: f64 = 100.0;

struct SimState {
    co2: f64,
    rising: bool,
}

/// Simulated sensor: CO2 walks a triangle wave between 400 and 2000 ppm
/// so alerts fire and clear on their own during local development;
/// temperature and humidity jitter around room values.
pub struct SimulatedSensor {
    state: Mutex<SimState>,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                co2: SIM_CO2_MIN,
                rising: true,
            }),
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for SimulatedSensor {
    fn read(&self) -> Result<Measurement, SensorError> {
        let mut state = self.state.lock();

        let co2 = state.co2;
        if state.rising {
            state.co2 += SIM_CO2_STEP;
            if state.co2 >= SIM_CO2_MAX {
                state.co2 = SIM_CO2_MAX;
                state.rising = false;
            }
        } else {
            state.co2 -= SIM_CO2_STEP;
            if state.co2 <= SIM_CO2_MIN {
                state.co2 = SIM_CO2_MIN;
                state.rising = true;
            }
        }

        let mut rng = rand::thread_rng();
        Ok(Measurement {
            co2,
            temperature: 22.0 + rng.gen_range(-1.5..1.5),
            humidity: 45.0 + rng.gen_range(-3.0..3.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulator_stays_in_bounds() {
        let sensor = SimulatedSensor::new();

        for _ in 0..100 {
            let m = sensor.read().unwrap();
            assert!((SIM_CO2_MIN..=SIM_CO2_MAX).contains(&m.co2));
            assert!((20.0..=24.0).contains(&m.temperature));
            assert!((42.0..=48.0).contains(&m.humidity));
        }
    }

    #[test]
    fn test_simulator_sweeps_both_thresholds() {
        let sensor = SimulatedSensor::new();

        let mut saw_high = false;
        let mut saw_low_after_high = false;
        for _ in 0..40 {
            let m = sensor.read().unwrap();
            if m.co2 >= 1500.0 {
                saw_high = true;
            }
            if saw_high && m.co2 <= 500.0 {
                saw_low_after_high = true;
            }
        }

        assert!(saw_high);
        assert!(saw_low_after_high);
    }
}
