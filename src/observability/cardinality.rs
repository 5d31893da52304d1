//! Top-N model cardinality limiting.
//!
//! Tracks per-model query frequency inside a fixed time window and collapses
//! models outside the top N into a single `other` label. The window resets
//! periodically so the hot set follows shifting traffic patterns instead of
//! freezing on startup behavior.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Label for queries whose model could not be determined. Passed through
/// untracked, never collapsed into [`OTHER_MODEL`].
pub const UNKNOWN_MODEL: &str = "unknown";

/// Catch-all label for models outside the top-N set.
pub const OTHER_MODEL: &str = "other";

/// Default number of models tracked individually.
pub const DEFAULT_TOP_MODELS_LIMIT: usize = 20;

/// Default interval between frequency-table resets.
pub const DEFAULT_RESET_INTERVAL: Duration = Duration::from_secs(3600);

struct FrequencyTable {
    counts: HashMap<String, u64>,
    last_reset: Instant,
}

/// Bounds model label cardinality to the N most frequent models of the
/// current window.
///
/// All state is owned by the instance; two limiters never share counts.
pub struct CardinalityLimiter {
    top_limit: usize,
    reset_interval: Duration,
    table: Mutex<FrequencyTable>,
}

impl CardinalityLimiter {
    /// Create a limiter tracking `top_limit` models per `reset_interval`
    /// window.
    pub fn new(top_limit: usize, reset_interval: Duration) -> Self {
        Self {
            top_limit,
            reset_interval,
            table: Mutex::new(FrequencyTable {
                counts: HashMap::new(),
                last_reset: Instant::now(),
            }),
        }
    }

    /// Record one occurrence of `model` and return the label to report.
    ///
    /// `unknown` passes through unchanged. A model inside the current top-N
    /// set keeps its own label; everything else maps to `other`.
    pub fn limit(&self, model: &str) -> String {
        self.limit_at(model, Instant::now())
    }

    // The reset clock is driven by the caller-supplied instant so tests can
    // advance time explicitly.
    fn limit_at(&self, model: &str, now: Instant) -> String {
        // Single lock acquisition covers the reset check, the increment, and
        // the top-N snapshot: concurrent callers cannot double-reset or lose
        // increments between the check and the clear.
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);

        if now.duration_since(table.last_reset) > self.reset_interval {
            table.counts.clear();
            table.last_reset = now;
        }

        if model == UNKNOWN_MODEL {
            return UNKNOWN_MODEL.to_string();
        }

        *table.counts.entry(model.to_string()).or_insert(0) += 1;

        if table.counts.len() <= self.top_limit {
            return model.to_string();
        }

        let mut by_count: Vec<(&str, u64)> = table
            .counts
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        by_count.sort_unstable_by(|a, b| b.1.cmp(&a.1));

        let in_top = by_count
            .iter()
            .take(self.top_limit)
            .any(|(name, _)| *name == model);

        if in_top {
            model.to_string()
        } else {
            OTHER_MODEL.to_string()
        }
    }
}

impl Default for CardinalityLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_MODELS_LIMIT, DEFAULT_RESET_INTERVAL)
    }
}
