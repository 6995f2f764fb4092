//! Fallback estimator for pairs without a usable route.

use crate::config::EstimateConfig;
use crate::geo::round1;
use crate::pair::{Measurement, Provenance};

#[derive(Debug, Clone, Copy)]
pub struct Estimator {
    correction_factor: f64,
    minutes_per_km: f64,
}

impl Default for Estimator {
    fn default() -> Self {
        Self::from_config(&EstimateConfig::default())
    }
}

impl Estimator {
    pub fn from_config(config: &EstimateConfig) -> Self {
        Self {
            correction_factor: config.correction_factor,
            minutes_per_km: config.minutes_per_km,
        }
    }

    /// Road ≈ air × factor; minutes ≈ road × minutes-per-km, taken from
    /// the unrounded road figure.
    pub fn estimate(&self, air_km: f64) -> Measurement {
        let road = air_km.max(0.0) * self.correction_factor;
        Measurement {
            road_km: round1(road),
            minutes: (road * self.minutes_per_km).round() as u32,
            provenance: Provenance::EstimatedFallback,
        }
    }
}
