//! Verification pass: re-resolve both endpoints with district-qualified
//! queries, route between the fresh place identifiers, and compare against
//! the stored distance.
//!
//! ```text
//! Unverified ──► VerifiedOk
//!      │    └──► VerifiedProblem ──(apply)──► stored pair reconciled
//!      └──► stays Unverified (missing-place-id / no-route / provider-error)
//! ```
//!
//! The engine never writes distances itself. Findings are persisted for
//! review and only [`apply_findings`] touches the job state.

use super::classify::{classify, Discrepancy, Severity, Verdict};
use crate::audit;
use crate::config::VerificationConfig;
use crate::error::Result;
use crate::job::JobState;
use crate::pair::{DistancePair, PairKey, Provenance};
use crate::place::PlaceResolver;
use crate::registry::PlaceRegistry;
use crate::routing::{DistanceResolver, Waypoint};
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const FINDINGS_FILE: &str = "verification-findings.json";

/// Which stored pairs a verification run re-checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    All,
    /// Pairs whose distance is a fallback estimate.
    Estimated,
    /// Pairs whose municipality shares its name with another.
    Ambiguous,
    /// Pairs the offline audit flags.
    Suspicious,
}

impl Scope {
    fn includes(self, pair: &DistancePair, registry: &PlaceRegistry) -> bool {
        match self {
            Self::All => true,
            Self::Estimated => pair.provenance == Provenance::EstimatedFallback,
            Self::Ambiguous => registry.is_ambiguous(&pair.municipality_slug),
            Self::Suspicious => audit::classify(pair).is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    MissingPlaceId,
    NoRoute,
    ProviderError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub pair: String,
    pub reason: FailureReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub municipality_slug: String,
    pub city_slug: String,
    pub air_distance: f64,
    pub original_distance: f64,
    pub original_duration: u32,
    pub new_distance: f64,
    pub new_duration: u32,
    pub diff_km: f64,
    pub diff_percent: f64,
    pub severity: Severity,
}

impl Finding {
    pub fn key(&self) -> PairKey {
        PairKey::new(&self.municipality_slug, &self.city_slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub generated_at: DateTime<Utc>,
    pub scope: Scope,
    pub checked: usize,
    pub ok: usize,
    pub problems: usize,
    pub errors: usize,
    #[serde(default)]
    pub by_severity: BTreeMap<Severity, usize>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub failures: Vec<Failure>,
}

impl VerificationReport {
    fn new(scope: Scope) -> Self {
        Self {
            generated_at: Utc::now(),
            scope,
            checked: 0,
            ok: 0,
            problems: 0,
            errors: 0,
            by_severity: BTreeMap::new(),
            findings: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, key: &PairKey, reason: FailureReason, detail: Option<String>) {
        tracing::warn!(pair = %key, ?reason, detail = detail.as_deref().unwrap_or(""), "pair left unverified");
        self.errors += 1;
        self.failures.push(Failure {
            pair: key.to_string(),
            reason,
            detail,
        });
    }
}

pub fn write_report(store: &dyn DocumentStore, report: &VerificationReport) -> Result<()> {
    store.write(FINDINGS_FILE, &serde_json::to_string_pretty(report)?)
}

pub fn read_report(store: &dyn DocumentStore) -> Result<Option<VerificationReport>> {
    match store.read(FINDINGS_FILE)? {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySummary {
    pub applied: usize,
    pub below_severity: usize,
    pub unknown: usize,
}

/// Write findings at or above `min_severity` back into the job state and
/// flush it.
pub fn apply_findings(
    job: &mut JobState,
    findings: &[Finding],
    min_severity: Severity,
) -> Result<ApplySummary> {
    let mut summary = ApplySummary::default();
    for finding in findings {
        if finding.severity < min_severity {
            summary.below_severity += 1;
            continue;
        }
        let key = finding.key();
        if job.apply_repair(&key, finding.new_distance, finding.new_duration) {
            tracing::info!(
                pair = %key,
                from = finding.original_distance,
                to = finding.new_distance,
                severity = %finding.severity,
                "distance reconciled"
            );
            summary.applied += 1;
        } else {
            summary.unknown += 1;
        }
    }
    job.checkpoint()?;
    Ok(summary)
}

/// Outcome of re-resolving one endpoint, remembered for the rest of the run.
#[derive(Debug, Clone)]
enum Lookup {
    Found(String),
    Missing,
    Failed(String),
}

pub struct Reconciler<'a> {
    registry: &'a PlaceRegistry,
    places: &'a mut PlaceResolver,
    distances: &'a DistanceResolver,
    thresholds: VerificationConfig,
    refreshed: HashMap<String, Lookup>,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        registry: &'a PlaceRegistry,
        places: &'a mut PlaceResolver,
        distances: &'a DistanceResolver,
        thresholds: VerificationConfig,
    ) -> Self {
        Self {
            registry,
            places,
            distances,
            thresholds,
            refreshed: HashMap::new(),
        }
    }

    /// Re-check the stored pairs selected by `scope`, at most `limit` of them.
    pub fn verify(
        &mut self,
        job: &JobState,
        scope: Scope,
        limit: Option<usize>,
        should_stop: &dyn Fn() -> bool,
    ) -> Result<VerificationReport> {
        let registry = self.registry;
        let selected: Vec<&DistancePair> = job
            .results()
            .filter(|pair| scope.includes(pair, registry))
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        tracing::info!(?scope, selected = selected.len(), stored = job.len(), "verification started");

        let mut report = VerificationReport::new(scope);
        for (i, pair) in selected.iter().enumerate() {
            if should_stop() {
                tracing::warn!(checked = report.checked, "stop requested");
                break;
            }
            self.check(pair, &mut report);
            if (i + 1) % 25 == 0 {
                tracing::info!(
                    progress = %format!("{}/{}", i + 1, selected.len()),
                    problems = report.problems,
                    errors = report.errors,
                    "verifying"
                );
            }
        }

        report.findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.diff_percent.total_cmp(&a.diff_percent))
        });
        tracing::info!(
            checked = report.checked,
            ok = report.ok,
            problems = report.problems,
            errors = report.errors,
            "verification finished"
        );
        Ok(report)
    }

    fn check(&mut self, pair: &DistancePair, report: &mut VerificationReport) {
        let key = pair.key();
        let from = self.identity(&pair.municipality_slug);
        let to = self.identity(&pair.city_slug);
        let (from, to) = match (from, to) {
            (Lookup::Found(a), Lookup::Found(b)) => (a, b),
            (Lookup::Failed(e), _) | (_, Lookup::Failed(e)) => {
                return report.fail(&key, FailureReason::ProviderError, Some(e));
            }
            _ => return report.fail(&key, FailureReason::MissingPlaceId, None),
        };

        let fresh = match self
            .distances
            .road_distance(&Waypoint::Place(from), &Waypoint::Place(to))
        {
            Ok(Some(road)) => road,
            Ok(None) => return report.fail(&key, FailureReason::NoRoute, None),
            Err(e) => {
                return report.fail(&key, FailureReason::ProviderError, Some(e.to_string()))
            }
        };

        report.checked += 1;
        let discrepancy = Discrepancy::between(pair.road_distance, fresh.distance_km);
        match classify(&discrepancy, &self.thresholds) {
            Verdict::Ok => {
                tracing::debug!(pair = %key, stored = pair.road_distance, fresh = fresh.distance_km, "verified ok");
                report.ok += 1;
            }
            Verdict::Problem(severity) => {
                tracing::info!(
                    pair = %key,
                    stored = pair.road_distance,
                    fresh = fresh.distance_km,
                    diff_percent = discrepancy.diff_percent.round(),
                    %severity,
                    "discrepancy found"
                );
                report.problems += 1;
                *report.by_severity.entry(severity).or_default() += 1;
                report.findings.push(Finding {
                    municipality_slug: pair.municipality_slug.clone(),
                    city_slug: pair.city_slug.clone(),
                    air_distance: pair.air_distance,
                    original_distance: pair.road_distance,
                    original_duration: pair.duration,
                    new_distance: fresh.distance_km,
                    new_duration: fresh.duration_min,
                    diff_km: crate::geo::round1(discrepancy.diff_km),
                    diff_percent: discrepancy.diff_percent.round(),
                    severity,
                });
            }
        }
    }

    /// Re-resolve a slug once per run, reusing the outcome afterwards.
    fn identity(&mut self, slug: &str) -> Lookup {
        if let Some(known) = self.refreshed.get(slug) {
            return known.clone();
        }
        let lookup = match self.registry.endpoint(slug) {
            None => {
                tracing::warn!(slug, "slug not in registry");
                Lookup::Missing
            }
            Some(endpoint) => {
                match self
                    .places
                    .re_resolve(&endpoint.name, endpoint.district.as_deref(), slug)
                {
                    Ok(refresh) => match refresh.identity() {
                        Some(identity) => Lookup::Found(identity.place_id.clone()),
                        None => Lookup::Missing,
                    },
                    Err(e) => Lookup::Failed(e.to_string()),
                }
            }
        };
        self.refreshed.insert(slug.to_string(), lookup.clone());
        lookup
    }
}
