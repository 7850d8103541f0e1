//! Best score per level
//!
//! Persisted as a single JSON object (`{"1": 800, "2": 1200}`) so the table
//! survives reloads. Entries only ever go up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, load_json, save_json};

/// Level (as a string key) to best score
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BestScores {
    entries: BTreeMap<String, u64>,
}

impl BestScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Best score for `level`, 0 if never recorded
    pub fn get(&self, level: u32) -> u64 {
        self.entries.get(&level.to_string()).copied().unwrap_or(0)
    }

    /// Check if a score would replace the stored best
    pub fn qualifies(&self, level: u32, score: u64) -> bool {
        score > self.get(level)
    }

    /// Keep `score` if it beats the stored best. Returns true when it did.
    pub fn record(&mut self, level: u32, score: u64) -> bool {
        if !self.qualifies(level, score) {
            return false;
        }
        self.entries.insert(level.to_string(), score);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// [`BestScores`] bound to a key-value store, written through on every improvement
pub struct ScoreStore<S: KeyValueStore> {
    store: S,
    scores: BestScores,
}

impl<S: KeyValueStore> ScoreStore<S> {
    pub const STORAGE_KEY: &'static str = "pumpkin_best_scores";

    /// Load the table, starting fresh if it is missing or unreadable
    pub fn load(store: S) -> Self {
        let scores = match load_json::<BestScores>(&store, Self::STORAGE_KEY) {
            Ok(Some(scores)) => {
                log::info!("Loaded best scores for {} levels", scores.len());
                scores
            }
            Ok(None) => {
                log::info!("No best scores found, starting fresh");
                BestScores::new()
            }
            Err(e) => {
                log::warn!("Ignoring stored best scores: {}", e);
                BestScores::new()
            }
        };
        Self { store, scores }
    }

    pub fn get(&self, level: u32) -> u64 {
        self.scores.get(level)
    }

    /// Record an attempt's score; persists immediately when it is a new best
    pub fn record_attempt(&mut self, level: u32, score: u64) -> bool {
        if !self.scores.record(level, score) {
            return false;
        }
        match save_json(&mut self.store, Self::STORAGE_KEY, &self.scores) {
            Ok(()) => log::info!("New best for level {}: {}", level, score),
            Err(e) => log::warn!("Best score for level {} not saved: {}", level, e),
        }
        true
    }

    pub fn scores(&self) -> &BestScores {
        &self.scores
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
