//! Offline sanity audit of stored distances. No network calls.

use crate::pair::{DistancePair, Provenance};
use serde::Serialize;
use std::collections::BTreeMap;

/// Road longer than this multiple of air distance counts as a detour.
pub const DETOUR_FACTOR: f64 = 3.0;
/// Below this air distance routing is too noisy for the ratio check.
pub const DETOUR_MIN_AIR_KM: f64 = 2.0;
const MAX_EXAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anomaly {
    RoadShorterThanAir,
    ExtremeDetour,
    ZeroDistance,
}

/// First anomaly that applies, if any. Pairs whose endpoints share a slug
/// are never flagged.
pub fn classify(pair: &DistancePair) -> Option<Anomaly> {
    if pair.municipality_slug == pair.city_slug {
        return None;
    }
    let (air, road) = (pair.air_distance, pair.road_distance);
    if road < air {
        Some(Anomaly::RoadShorterThanAir)
    } else if air > DETOUR_MIN_AIR_KM && road > air * DETOUR_FACTOR {
        Some(Anomaly::ExtremeDetour)
    } else if road == 0.0 || air == 0.0 {
        Some(Anomaly::ZeroDistance)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditExample {
    pub pair: String,
    pub air_distance: f64,
    pub road_distance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnomalyClass {
    pub count: usize,
    pub examples: Vec<AuditExample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub total_pairs: usize,
    pub valid: usize,
    pub by_provenance: BTreeMap<Provenance, usize>,
    pub anomalies: BTreeMap<Anomaly, AnomalyClass>,
}

pub fn audit<'a>(pairs: impl IntoIterator<Item = &'a DistancePair>) -> AuditSummary {
    let mut summary = AuditSummary::default();
    for pair in pairs {
        summary.total_pairs += 1;
        *summary.by_provenance.entry(pair.provenance).or_default() += 1;

        let Some(kind) = classify(pair) else {
            summary.valid += 1;
            continue;
        };
        let class = summary.anomalies.entry(kind).or_default();
        class.count += 1;
        if class.examples.len() < MAX_EXAMPLES {
            class.examples.push(AuditExample {
                pair: pair.key().to_string(),
                air_distance: pair.air_distance,
                road_distance: pair.road_distance,
            });
        }
    }

    for (kind, class) in &summary.anomalies {
        tracing::warn!(anomaly = ?kind, count = class.count, "distance anomalies");
    }
    summary
}
