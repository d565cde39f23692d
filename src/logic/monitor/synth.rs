//! Synthetic sensor readings for the real-time monitor

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::logic::scoring::FeatureVector;

/// Inclusive integer range one sensor is drawn from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRange {
    pub name: String,
    pub min: i64,
    pub max: i64,
}

impl SensorRange {
    pub fn new(name: impl Into<String>, min: i64, max: i64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self { name: name.into(), min, max }
    }
}

/// Draws each feature independently from its own bounded range
#[derive(Debug, Clone)]
pub struct SensorSynth {
    ranges: Vec<SensorRange>,
}

impl Default for SensorSynth {
    /// sensor_1 20..=119, sensor_2 30..=129, sensor_3 40..=139
    fn default() -> Self {
        Self::new(vec![
            SensorRange::new("sensor_1", 20, 119),
            SensorRange::new("sensor_2", 30, 129),
            SensorRange::new("sensor_3", 40, 139),
        ])
    }
}

impl SensorSynth {
    pub fn new(ranges: Vec<SensorRange>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[SensorRange] {
        &self.ranges
    }

    pub fn sample(&self) -> FeatureVector {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> FeatureVector {
        self.ranges
            .iter()
            .map(|r| (r.name.clone(), rng.gen_range(r.min..=r.max) as f64))
            .collect()
    }
}
