//! Municipality → hub distance records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a stored road distance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// A real routing call.
    #[default]
    Resolved,
    /// `air × factor`; always a candidate for re-verification.
    EstimatedFallback,
    /// Overwritten by an applied verification finding.
    Reconciled,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved => write!(f, "resolved"),
            Self::EstimatedFallback => write!(f, "estimated-fallback"),
            Self::Reconciled => write!(f, "reconciled"),
        }
    }
}

/// `(municipality slug, hub slug)`; rendered as `"municipality:hub"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    pub municipality: String,
    pub hub: String,
}

impl PairKey {
    pub fn new(municipality: impl Into<String>, hub: impl Into<String>) -> Self {
        Self {
            municipality: municipality.into(),
            hub: hub.into(),
        }
    }

    /// Parse the `"municipality:hub"` text form.
    pub fn parse(text: &str) -> Option<Self> {
        let (municipality, hub) = text.split_once(':')?;
        if municipality.is_empty() || hub.is_empty() {
            return None;
        }
        Some(Self::new(municipality, hub))
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.municipality, self.hub)
    }
}

/// A road distance plus duration, in stored units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub road_km: f64,
    pub minutes: u32,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistancePair {
    pub municipality_slug: String,
    pub city_slug: String,
    pub air_distance: f64,
    pub road_distance: f64,
    /// Minutes.
    pub duration: u32,
    #[serde(default)]
    pub provenance: Provenance,
}

impl DistancePair {
    pub fn new(key: &PairKey, air_km: f64, measured: Measurement) -> Self {
        Self {
            municipality_slug: key.municipality.clone(),
            city_slug: key.hub.clone(),
            air_distance: air_km,
            road_distance: measured.road_km.max(0.0),
            duration: measured.minutes,
            provenance: measured.provenance,
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(&self.municipality_slug, &self.city_slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_text_form() {
        let key = PairKey::new("hostice-zvolen", "zvolen");
        assert_eq!(key.to_string(), "hostice-zvolen:zvolen");
        assert_eq!(PairKey::parse("hostice-zvolen:zvolen"), Some(key));
        assert_eq!(PairKey::parse("no-separator"), None);
        assert_eq!(PairKey::parse(":zvolen"), None);
    }

    #[test]
    fn test_pair_json_shape() {
        let key = PairKey::new("hostice-zvolen", "zvolen");
        let pair = DistancePair::new(
            &key,
            3.4,
            Measurement {
                road_km: 6.8,
                minutes: 10,
                provenance: Provenance::EstimatedFallback,
            },
        );
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["municipalitySlug"], "hostice-zvolen");
        assert_eq!(json["citySlug"], "zvolen");
        assert_eq!(json["provenance"], "estimated-fallback");
    }

    #[test]
    fn test_legacy_record_defaults_to_resolved() {
        let pair: DistancePair = serde_json::from_str(
            r#"{"municipalitySlug":"a","citySlug":"b","airDistance":1.0,"roadDistance":2.0,"duration":3}"#,
        )
        .unwrap();
        assert_eq!(pair.provenance, Provenance::Resolved);
    }

    #[test]
    fn test_negative_road_distance_clamped() {
        let pair = DistancePair::new(
            &PairKey::new("a", "b"),
            1.0,
            Measurement {
                road_km: -1.0,
                minutes: 0,
                provenance: Provenance::Resolved,
            },
        );
        assert_eq!(pair.road_distance, 0.0);
    }
}
