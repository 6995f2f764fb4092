//! Discrepancy classification between a stored and a re-resolved distance.

use crate::config::VerificationConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Small,
    Moderate,
    Large,
    Extreme,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Small => "small",
            Self::Moderate => "moderate",
            Self::Large => "large",
            Self::Extreme => "extreme",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discrepancy {
    pub diff_km: f64,
    /// Relative to the stored value; 0 when the stored value is 0.
    pub diff_percent: f64,
}

impl Discrepancy {
    pub fn between(stored_km: f64, fresh_km: f64) -> Self {
        let diff_km = (fresh_km - stored_km).abs();
        let diff_percent = if stored_km > 0.0 {
            diff_km / stored_km * 100.0
        } else {
            0.0
        };
        Self {
            diff_km,
            diff_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Problem(Severity),
}

pub fn severity(diff_percent: f64, config: &VerificationConfig) -> Severity {
    if diff_percent > config.extreme_percent {
        Severity::Extreme
    } else if diff_percent > config.large_percent {
        Severity::Large
    } else if diff_percent > config.moderate_percent {
        Severity::Moderate
    } else {
        Severity::Small
    }
}

/// A problem when either threshold is exceeded.
pub fn classify(d: &Discrepancy, config: &VerificationConfig) -> Verdict {
    if d.diff_km > config.threshold_km || d.diff_percent > config.threshold_percent {
        Verdict::Problem(severity(d.diff_percent, config))
    } else {
        Verdict::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_small_drift_is_ok() {
        let d = Discrepancy::between(12.3, 12.6);
        assert_relative_eq!(d.diff_percent, 2.439, epsilon = 1e-3);
        assert_eq!(classify(&d, &VerificationConfig::default()), Verdict::Ok);
    }

    #[test]
    fn test_large_jump_is_extreme() {
        let d = Discrepancy::between(8.0, 19.0);
        assert_relative_eq!(d.diff_percent, 137.5, epsilon = 1e-9);
        assert_eq!(
            classify(&d, &VerificationConfig::default()),
            Verdict::Problem(Severity::Extreme)
        );
    }

    #[test]
    fn test_km_threshold_alone_flags() {
        // 6 km on 100 km is only 6% but exceeds 5 km.
        let d = Discrepancy::between(100.0, 106.0);
        assert_eq!(
            classify(&d, &VerificationConfig::default()),
            Verdict::Problem(Severity::Small)
        );
    }

    #[test]
    fn test_severity_bands() {
        let c = VerificationConfig::default();
        assert_eq!(severity(25.0, &c), Severity::Small);
        assert_eq!(severity(30.0, &c), Severity::Small);
        assert_eq!(severity(45.0, &c), Severity::Moderate);
        assert_eq!(severity(75.0, &c), Severity::Large);
        assert_eq!(severity(100.0, &c), Severity::Large);
        assert_eq!(severity(100.1, &c), Severity::Extreme);
    }

    #[test]
    fn test_zero_stored_value() {
        let d = Discrepancy::between(0.0, 3.0);
        assert_eq!(d.diff_percent, 0.0);
        assert_eq!(classify(&d, &VerificationConfig::default()), Verdict::Ok);
        assert!(matches!(
            classify(&Discrepancy::between(0.0, 7.0), &VerificationConfig::default()),
            Verdict::Problem(_)
        ));
    }
}
