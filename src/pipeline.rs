//! Batch resolution run: registry → candidates → identities → distances → job state.
//!
//! One pair at a time, to completion. A stop request is honoured at the top
//! of the loop; a per-pair failure is counted and the pair left unchecked
//! so the next run picks it up.

use crate::candidates::nearest;
use crate::error::{PipelineError, Result};
use crate::geo::round1;
use crate::job::JobState;
use crate::pair::{DistancePair, PairKey, Provenance};
use crate::place::PlaceResolver;
use crate::registry::{CityHub, Municipality, PlaceRegistry};
use crate::routing::{DistanceResolver, Waypoint};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Which waypoints the bulk pass hands to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Raw coordinates; no identity lookups needed.
    #[default]
    Coordinates,
    /// Resolved place identifiers for both endpoints.
    PlaceId,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub strategy: Strategy,
    /// Restrict the run to one municipality slug.
    pub municipality: Option<String>,
    /// Stop after attempting this many pending pairs.
    pub max_pairs: Option<usize>,
    pub candidates: usize,
    pub progress_every: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Coordinates,
            municipality: None,
            max_pairs: None,
            candidates: crate::candidates::DEFAULT_CANDIDATES,
            progress_every: 50,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_pairs: usize,
    pub already_done: usize,
    pub resolved: usize,
    pub estimated: usize,
    pub errors: usize,
    pub provider_calls: u64,
    pub stopped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmupSummary {
    pub resolved: usize,
    pub unresolved: usize,
    pub errors: usize,
    pub provider_calls: u64,
}

struct WorkItem<'r> {
    municipality: &'r Municipality,
    hub: &'r CityHub,
    air_km: f64,
}

impl WorkItem<'_> {
    fn key(&self) -> PairKey {
        PairKey::new(&self.municipality.slug, &self.hub.slug)
    }
}

pub struct BatchResolver<'a> {
    registry: &'a PlaceRegistry,
    places: &'a mut PlaceResolver,
    distances: &'a DistanceResolver,
    job: &'a mut JobState,
}

impl<'a> BatchResolver<'a> {
    pub fn new(
        registry: &'a PlaceRegistry,
        places: &'a mut PlaceResolver,
        distances: &'a DistanceResolver,
        job: &'a mut JobState,
    ) -> Self {
        Self {
            registry,
            places,
            distances,
            job,
        }
    }

    /// Process every pending pair for the selected targets.
    pub fn run(&mut self, options: &RunOptions, should_stop: &dyn Fn() -> bool) -> Result<RunSummary> {
        let registry = self.registry;
        let targets: Vec<&Municipality> = match &options.municipality {
            Some(slug) => vec![registry
                .municipality(slug)
                .ok_or_else(|| PipelineError::UnknownSlug(slug.clone()))?],
            None => registry.municipalities().iter().collect(),
        };

        let work: Vec<WorkItem<'_>> = targets
            .iter()
            .flat_map(|&municipality| {
                nearest(municipality, registry.hubs(), options.candidates)
                    .into_iter()
                    .map(move |c| WorkItem {
                        municipality,
                        hub: c.hub,
                        air_km: c.air_km,
                    })
            })
            .collect();

        let mut summary = RunSummary {
            total_pairs: work.len(),
            ..RunSummary::default()
        };
        let pending: Vec<&WorkItem<'_>> = work.iter().filter(|w| !self.job.is_done(&w.key())).collect();
        summary.already_done = work.len() - pending.len();
        let budget = options.max_pairs.unwrap_or(pending.len()).min(pending.len());

        tracing::info!(
            total = summary.total_pairs,
            already_done = summary.already_done,
            pending = pending.len(),
            budget,
            strategy = ?options.strategy,
            "starting batch"
        );

        let calls_before = self.distances.limiter().calls();
        let started = Instant::now();
        let mut processed = 0usize;

        for item in pending.into_iter().take(budget) {
            if should_stop() {
                tracing::warn!(processed, "stop requested, finishing after checkpoint");
                summary.stopped = true;
                break;
            }

            let key = item.key();
            match self.resolve_pair(item, options.strategy) {
                Ok(pair) => {
                    match pair.provenance {
                        Provenance::EstimatedFallback => summary.estimated += 1,
                        _ => summary.resolved += 1,
                    }
                    self.job.record(pair)?;
                }
                Err(e) => {
                    summary.errors += 1;
                    tracing::warn!(pair = %key, error = %e, "pair skipped");
                }
            }

            processed += 1;
            if options.progress_every > 0 && processed % options.progress_every == 0 {
                log_progress(processed, budget, summary.errors, started.elapsed());
            }
        }

        self.job.checkpoint()?;
        summary.provider_calls = self.distances.limiter().calls() - calls_before;
        tracing::info!(
            resolved = summary.resolved,
            estimated = summary.estimated,
            errors = summary.errors,
            provider_calls = summary.provider_calls,
            elapsed_s = started.elapsed().as_secs(),
            "batch finished"
        );
        Ok(summary)
    }

    fn resolve_pair(&mut self, item: &WorkItem<'_>, strategy: Strategy) -> Result<DistancePair> {
        let (from, to) = match strategy {
            Strategy::Coordinates => (
                Some(Waypoint::Coordinates(item.municipality.coords)),
                item.hub.coords.map(Waypoint::Coordinates),
            ),
            Strategy::PlaceId => {
                let m = item.municipality;
                let from = self
                    .places
                    .resolve(&m.name, m.district.as_deref(), &m.slug)?
                    .map(|p| Waypoint::Place(p.place_id));
                let to = self
                    .places
                    .resolve(&item.hub.name, None, &item.hub.slug)?
                    .map(|p| Waypoint::Place(p.place_id));
                (from, to)
            }
        };

        let measured = self.distances.measure(from.as_ref(), to.as_ref(), item.air_km)?;
        Ok(DistancePair::new(&item.key(), round1(item.air_km), measured))
    }
}

fn log_progress(processed: usize, total: usize, errors: usize, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { processed as f64 / secs } else { 0.0 };
    let eta_min = if rate > 0.0 {
        (total.saturating_sub(processed) as f64 / rate / 60.0).round() as u64
    } else {
        0
    };
    tracing::info!(
        progress = %format!("{}/{}", processed, total),
        errors,
        rate_per_min = (rate * 60.0).round() as u64,
        eta_min,
        "progress"
    );
}

/// Resolve (cache-first) identities for every municipality and hub.
pub fn warm_places(
    registry: &PlaceRegistry,
    places: &mut PlaceResolver,
    should_stop: &dyn Fn() -> bool,
) -> Result<WarmupSummary> {
    let calls_before = places.limiter().calls();
    let endpoints = registry
        .municipalities()
        .iter()
        .map(|m| (m.slug.as_str(), m.name.as_str(), m.district.as_deref()))
        .chain(
            registry
                .hubs()
                .iter()
                .map(|h| (h.slug.as_str(), h.name.as_str(), None)),
        );

    let mut summary = WarmupSummary::default();
    for (slug, name, district) in endpoints {
        if should_stop() {
            tracing::warn!("stop requested");
            break;
        }
        match places.resolve(name, district, slug) {
            Ok(Some(_)) => summary.resolved += 1,
            Ok(None) => summary.unresolved += 1,
            Err(e) => {
                summary.errors += 1;
                tracing::warn!(slug, error = %e, "identity lookup failed");
            }
        }
    }
    summary.provider_calls = places.limiter().calls() - calls_before;
    tracing::info!(
        resolved = summary.resolved,
        unresolved = summary.unresolved,
        errors = summary.errors,
        cached = places.cache_len(),
        "identity warm-up finished"
    );
    Ok(summary)
}
