//! Superlative resolution: which metric "wins" an area under a scoring mode, memoized per
//! `(area, category, mode, election)`.

use crate::models::{Category, Model, PSEUDO_METRICS, TURNOUT, VOTERS};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Metrics never considered as winners.
pub const SKIP_METRICS: [&str; 5] = [
    TURNOUT,
    VOTERS,
    PSEUDO_METRICS[0],
    PSEUDO_METRICS[1],
    PSEUDO_METRICS[2],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Largest raw value.
    Top,
    /// Largest standardized deviation `(value - mean) / sd`.
    Bias,
}

/// Find the winning metric without touching any cache.
///
/// A metric only competes if it has a value for the election and a population summary entry,
/// so every key returned here can be looked up in the summary. Non-finite scores (a zero sd
/// in `Bias` mode) are excluded. Ties keep the metric that came first.
pub fn find_superlative<'m>(
    model: &'m Model,
    area_id: &str,
    category: Category,
    election: &str,
    mode: Mode,
) -> Option<&'m str> {
    let table = model.area(area_id)?.category(category)?;
    let mut best: Option<(&str, f64)> = None;
    for (metric, series) in table.iter() {
        if SKIP_METRICS.contains(&metric) {
            continue;
        }
        let Some(stats) = model.summary.get(category, metric, election) else {
            continue;
        };
        let Some(value) = series.get(election).and_then(|c| c.value) else {
            continue;
        };
        let score = match mode {
            Mode::Top if value.is_finite() => value,
            Mode::Top => continue,
            Mode::Bias => match stats.standardize(value) {
                Some(s) if s.is_finite() => s,
                Some(_) => {
                    log::debug!("{area_id}: {metric} has a degenerate sd for {election}");
                    continue;
                }
                None => continue,
            },
        };
        if best.is_none_or(|(_, lead)| score > lead) {
            best = Some((metric, score));
        }
    }
    best.map(|(metric, _)| metric)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    area: String,
    category: Category,
    mode: Mode,
    election: String,
}

/// Memo of resolved winners.
///
/// Entries are never recomputed once set, even if the population summary changes afterwards.
/// Only [`SuperlativeCache::invalidate`] drops them.
#[derive(Debug, Clone, Default)]
pub struct SuperlativeCache {
    entries: AHashMap<CacheKey, String>,
}

impl SuperlativeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the winning metric, computing it on first use.
    /// Returns `None` when the area or category is absent or nothing qualifies; misses are not memoized.
    pub fn resolve(
        &mut self,
        model: &Model,
        area_id: &str,
        category: Category,
        election: &str,
        mode: Mode,
    ) -> Option<String> {
        let key = CacheKey {
            area: area_id.to_string(),
            category,
            mode,
            election: election.to_string(),
        };
        if let Some(hit) = self.entries.get(&key) {
            return Some(hit.clone());
        }
        let found = find_superlative(model, area_id, category, election, mode)?.to_string();
        self.entries.insert(key, found.clone());
        Some(found)
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
