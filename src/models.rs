use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudo-election holding the weighted cross-election average.
pub const SUMMARY_ELECTION: &str = "summary";

/// Ideological-axis metrics. Everything else in a value table is a vote share or turnout.
pub const VALUE_AXES: [&str; 2] = ["lrecon", "galtan"];

pub const TURNOUT: &str = "TURNOUT";
pub const VOTERS: &str = "VOTERS";

/// Keys that may appear next to real metrics in a category but never name one.
pub const PSEUDO_METRICS: [&str; 3] = [SUMMARY_ELECTION, "bias", "top"];

/// Top-level grouping of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Vote shares and turnout.
    Votes,
    /// Ideological-axis positions.
    Values,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Votes, Category::Values];

    /// Classify a metric key from a value-table column.
    pub fn of_metric(metric: &str) -> Self {
        if VALUE_AXES.contains(&metric) {
            Category::Values
        } else {
            Category::Votes
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Votes => "votes",
            Category::Values => "values",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "votes" => Some(Category::Votes),
            "values" => Some(Category::Values),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String-keyed map that remembers insertion order.
///
/// Metric order decides superlative tie-breaks and election order decides chart axes,
/// so lookups go through the hash index while iteration follows `keys`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    keys: Vec<String>,
    entries: AHashMap<String, V>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            entries: AHashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace. A replaced key keeps its first position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.entries.insert(key, value)
    }

    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        if !self.entries.contains_key(key) {
            self.keys.push(key.to_string());
        }
        self.entries.entry(key.to_string()).or_insert_with(make)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.keys
            .iter()
            .filter_map(|k| self.entries.get(k).map(|v| (k.as_str(), v)))
    }
}

impl<V: Default> OrderedMap<V> {
    pub fn entry_or_default(&mut self, key: &str) -> &mut V {
        self.get_or_insert_with(key, V::default)
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// One observation. `None` means "no data", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: Option<f64>,
}

impl Cell {
    pub fn new(value: Option<f64>) -> Self {
        Self { value }
    }
}

/// election id -> observation
pub type ElectionSeries = OrderedMap<Cell>;

/// metric key -> election series
pub type MetricTable = OrderedMap<ElectionSeries>;

/// All data for one electoral district.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaRecord {
    votes: Option<MetricTable>,
    values: Option<MetricTable>,
}

impl AreaRecord {
    pub fn category(&self, category: Category) -> Option<&MetricTable> {
        match category {
            Category::Votes => self.votes.as_ref(),
            Category::Values => self.values.as_ref(),
        }
    }

    pub fn category_mut(&mut self, category: Category) -> &mut MetricTable {
        let slot = match category {
            Category::Votes => &mut self.votes,
            Category::Values => &mut self.values,
        };
        slot.get_or_insert_with(MetricTable::new)
    }

    /// Raw value lookup. `None` for absent data as well as explicit nulls.
    pub fn value(&self, category: Category, metric: &str, election: &str) -> Option<f64> {
        self.cell(category, metric, election)?.value
    }

    pub fn cell(&self, category: Category, metric: &str, election: &str) -> Option<&Cell> {
        self.category(category)?.get(metric)?.get(election)
    }

    pub fn set(&mut self, category: Category, metric: &str, election: &str, value: Option<f64>) {
        self.category_mut(category)
            .entry_or_default(metric)
            .insert(election, Cell::new(value));
    }
}

/// Descriptive statistics of one metric across all districts for one election.
///
/// Fields are optional because each one arrives from its own summary row, and the
/// pipeline writes nulls for metrics without any data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: Option<f64>,
    pub sd: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Names of the four statistic rows in a value table.
pub const STAT_KEYS: [&str; 4] = ["mean", "sd", "min", "max"];

impl SummaryStats {
    /// Assign the field named by a statistic row key. Returns false for unknown keys.
    pub fn set_field(&mut self, stat: &str, value: Option<f64>) -> bool {
        let slot = match stat {
            "mean" => &mut self.mean,
            "sd" => &mut self.sd,
            "min" => &mut self.min,
            "max" => &mut self.max,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// `(value - mean) / sd`. A zero sd yields a non-finite score, which is returned as is.
    pub fn standardize(&self, value: f64) -> Option<f64> {
        Some((value - self.mean?) / self.sd?)
    }
}

/// Population statistics, nested like the area records: category -> metric -> election.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationSummary {
    votes: OrderedMap<OrderedMap<SummaryStats>>,
    values: OrderedMap<OrderedMap<SummaryStats>>,
}

impl PopulationSummary {
    pub fn metrics(&self, category: Category) -> &OrderedMap<OrderedMap<SummaryStats>> {
        match category {
            Category::Votes => &self.votes,
            Category::Values => &self.values,
        }
    }

    fn metrics_mut(&mut self, category: Category) -> &mut OrderedMap<OrderedMap<SummaryStats>> {
        match category {
            Category::Votes => &mut self.votes,
            Category::Values => &mut self.values,
        }
    }

    pub fn get(&self, category: Category, metric: &str, election: &str) -> Option<&SummaryStats> {
        self.metrics(category).get(metric)?.get(election)
    }

    pub fn entry(&mut self, category: Category, metric: &str, election: &str) -> &mut SummaryStats {
        self.metrics_mut(category)
            .entry_or_default(metric)
            .entry_or_default(election)
    }

    pub fn insert(&mut self, category: Category, metric: &str, election: &str, stats: SummaryStats) {
        *self.entry(category, metric, election) = stats;
    }
}

/// The in-memory statistical model: every area record plus the one population summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub areas: OrderedMap<AreaRecord>,
    pub summary: PopulationSummary,
}

impl Model {
    pub fn area(&self, id: &str) -> Option<&AreaRecord> {
        self.areas.get(id)
    }

    pub fn area_ids(&self) -> impl Iterator<Item = &str> {
        self.areas.keys()
    }
}
