//! Job state: the checkpoint set and the accumulating results, persisted
//! together at a fixed cadence so an interrupted run resumes where it left off.
//!
//! Both documents are rewritten whole from memory. A crash between flushes
//! loses at most `interval` pairs, which are simply resolved again.

use crate::error::Result;
use crate::pair::{DistancePair, PairKey, Provenance};
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

pub const CHECKPOINT_FILE: &str = "checkpoint.json";
pub const RESULTS_FILE: &str = "distances.json";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckpointFile {
    #[serde(default)]
    completed: Vec<String>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsFile {
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_pairs: usize,
    #[serde(default)]
    pub distances: Vec<DistancePair>,
}

/// Read the results document without taking ownership of the job.
pub fn read_results(store: &dyn DocumentStore) -> Result<Vec<DistancePair>> {
    match store.read(RESULTS_FILE)? {
        Some(text) => Ok(serde_json::from_str::<ResultsFile>(&text)?.distances),
        None => Ok(Vec::new()),
    }
}

pub struct JobState {
    store: Rc<dyn DocumentStore>,
    completed: BTreeSet<String>,
    results: BTreeMap<PairKey, DistancePair>,
    interval: usize,
    since_flush: usize,
    dirty: bool,
}

impl JobState {
    /// Load the checkpoint and results, if any. `interval` is the number of
    /// recorded pairs between automatic flushes.
    pub fn load(store: Rc<dyn DocumentStore>, interval: usize) -> Result<Self> {
        let checkpoint: CheckpointFile = match store.read(CHECKPOINT_FILE)? {
            Some(text) => serde_json::from_str(&text)?,
            None => CheckpointFile::default(),
        };
        let results: BTreeMap<PairKey, DistancePair> = read_results(store.as_ref())?
            .into_iter()
            .map(|pair| (pair.key(), pair))
            .collect();

        tracing::info!(
            completed = checkpoint.completed.len(),
            results = results.len(),
            "job state loaded"
        );

        Ok(Self {
            store,
            completed: checkpoint.completed.into_iter().collect(),
            results,
            interval: interval.max(1),
            since_flush: 0,
            dirty: false,
        })
    }

    pub fn is_done(&self, key: &PairKey) -> bool {
        self.completed.contains(&key.to_string())
    }

    /// Upsert a pair and mark it done. Flushes every `interval` records.
    pub fn record(&mut self, pair: DistancePair) -> Result<()> {
        let key = pair.key();
        self.completed.insert(key.to_string());
        self.results.insert(key, pair);
        self.dirty = true;
        self.since_flush += 1;
        if self.since_flush >= self.interval {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush if anything changed since the last write. Returns whether a
    /// write happened.
    pub fn checkpoint(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    /// Forget which pairs were done. Results stay; re-resolved pairs
    /// overwrite them.
    pub fn reset(&mut self) -> Result<()> {
        tracing::info!(cleared = self.completed.len(), "checkpoint reset");
        self.completed.clear();
        self.flush()
    }

    /// Overwrite a stored pair with a reconciled value. Unknown keys are
    /// left alone and reported as `false`. Call [`checkpoint`](Self::checkpoint)
    /// to persist.
    pub fn apply_repair(&mut self, key: &PairKey, road_km: f64, minutes: u32) -> bool {
        let Some(pair) = self.results.get_mut(key) else {
            tracing::warn!(pair = %key, "repair for unknown pair ignored");
            return false;
        };
        pair.road_distance = road_km.max(0.0);
        pair.duration = minutes;
        pair.provenance = Provenance::Reconciled;
        self.dirty = true;
        true
    }

    pub fn get(&self, key: &PairKey) -> Option<&DistancePair> {
        self.results.get(key)
    }

    pub fn results(&self) -> impl Iterator<Item = &DistancePair> {
        self.results.values()
    }

    pub fn completed_len(&self) -> usize {
        self.completed.len()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn flush(&mut self) -> Result<()> {
        let now = Utc::now();
        let results = ResultsFile {
            generated_at: Some(now),
            total_pairs: self.results.len(),
            distances: self.results.values().cloned().collect(),
        };
        let checkpoint = CheckpointFile {
            completed: self.completed.iter().cloned().collect(),
            last_updated: Some(now),
        };
        // Results first: a checkpointed key must always have its result on disk.
        self.store
            .write(RESULTS_FILE, &serde_json::to_string_pretty(&results)?)?;
        self.store
            .write(CHECKPOINT_FILE, &serde_json::to_string_pretty(&checkpoint)?)?;

        tracing::debug!(
            completed = self.completed.len(),
            results = self.results.len(),
            "checkpoint written"
        );
        self.since_flush = 0;
        self.dirty = false;
        Ok(())
    }
}
