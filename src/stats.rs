use crate::models::{Category, Model, SUMMARY_ELECTION, SummaryStats, TURNOUT};
use chrono::NaiveDate;
use serde_json::{Map, Value, json};

/// Four years: an election this far before the reference weighs half as much.
pub const DEFAULT_HALFLIFE_DAYS: f64 = 1461.0;

/// Mean, sample standard deviation, min and max of a metric across all areas.
///
/// Areas with a null value are left out. Returns `None` when no area has a value. `sd` stays
/// `None` with fewer than two values.
pub fn population_summary(
    model: &Model,
    category: Category,
    metric: &str,
    election: &str,
) -> Option<SummaryStats> {
    let mut vals: Vec<f64> = model
        .areas
        .iter()
        .filter_map(|(_, area)| area.value(category, metric, election))
        .collect();
    if vals.is_empty() {
        return None;
    }
    vals.sort_by(f64::total_cmp);
    let count = vals.len() as f64;
    let mean = vals.iter().sum::<f64>() / count;
    let sd = if vals.len() > 1 {
        let ss: f64 = vals.iter().map(|v| (v - mean).powi(2)).sum();
        Some((ss / (count - 1.0)).sqrt())
    } else {
        None
    };
    Some(SummaryStats {
        mean: Some(mean),
        sd,
        min: vals.first().copied(),
        max: vals.last().copied(),
    })
}

/// Recompute the population summary of every metric present for `election`.
/// Returns how many entries were written.
pub fn recompute_population_summary(model: &mut Model, election: &str) -> usize {
    let mut keys: Vec<(Category, String)> = Vec::new();
    for (_, area) in model.areas.iter() {
        for category in Category::ALL {
            let Some(table) = area.category(category) else {
                continue;
            };
            for (metric, series) in table.iter() {
                if series.contains_key(election)
                    && !keys.iter().any(|(c, m)| *c == category && m == metric)
                {
                    keys.push((category, metric.to_string()));
                }
            }
        }
    }
    let mut written = 0;
    for (category, metric) in keys {
        let stats = population_summary(model, category, &metric, election).unwrap_or_default();
        model.summary.insert(category, &metric, election, stats);
        written += 1;
    }
    log::info!("population summary for {election}: {written} metrics");
    written
}

/// Which elections feed the `summary` pseudo-election and how they are weighted.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightingPlan {
    pub reference: NaiveDate,
    pub halflife_days: f64,
    pub elections: Vec<(String, NaiveDate)>,
}

impl WeightingPlan {
    pub fn new(reference: NaiveDate, elections: Vec<(String, NaiveDate)>) -> Self {
        Self {
            reference,
            halflife_days: DEFAULT_HALFLIFE_DAYS,
            elections,
        }
    }

    /// Recency part of an election's weight: halves every `halflife_days` before the reference.
    pub fn recency(&self, date: NaiveDate) -> f64 {
        let days = (date - self.reference).num_days() as f64;
        2f64.powf(days / self.halflife_days)
    }
}

/// Derive the `summary` pseudo-election for every area, then its population summary.
///
/// Each election's weight is its recency times the area's turnout share in that election.
/// Elections where the area has no turnout are skipped, as are null values.
pub fn weighted_summary(model: &mut Model, plan: &WeightingPlan) -> usize {
    let mut updates: Vec<(String, Category, String, Option<f64>)> = Vec::new();
    for (area_id, area) in model.areas.iter() {
        let weights: Vec<(&str, f64)> = plan
            .elections
            .iter()
            .filter_map(|(election, date)| {
                let turnout = area.value(Category::Votes, TURNOUT, election)?;
                Some((election.as_str(), plan.recency(*date) * turnout / 100.0))
            })
            .collect();
        for category in Category::ALL {
            let Some(table) = area.category(category) else {
                continue;
            };
            for (metric, series) in table.iter() {
                let (mut num, mut den) = (0.0, 0.0);
                for (election, weight) in &weights {
                    if let Some(v) = series.get(election).and_then(|c| c.value) {
                        num += v * weight;
                        den += weight;
                    }
                }
                let value = (den > 0.0).then(|| num / den);
                updates.push((area_id.to_string(), category, metric.to_string(), value));
            }
        }
    }
    for (area_id, category, metric, value) in &updates {
        if let Some(area) = model.areas.get_mut(area_id) {
            area.set(*category, metric, SUMMARY_ELECTION, *value);
        }
    }
    recompute_population_summary(model, SUMMARY_ELECTION);
    updates.len()
}

fn opt(v: Option<f64>) -> Value {
    v.map_or(Value::Null, |x| json!(x))
}

/// Serialize the model in the nested summary-document shape:
/// `area -> category -> metric -> election -> {value}` plus `sds`.
pub fn summary_document(model: &Model) -> Value {
    let mut doc = Map::new();
    for (area_id, area) in model.areas.iter() {
        let mut cats = Map::new();
        for category in Category::ALL {
            let Some(table) = area.category(category) else {
                continue;
            };
            let mut metrics = Map::new();
            for (metric, series) in table.iter() {
                let elections: Map<String, Value> = series
                    .iter()
                    .map(|(e, cell)| (e.to_string(), json!({ "value": opt(cell.value) })))
                    .collect();
                metrics.insert(metric.to_string(), Value::Object(elections));
            }
            cats.insert(category.as_str().to_string(), Value::Object(metrics));
        }
        doc.insert(area_id.to_string(), Value::Object(cats));
    }

    let mut sds = Map::new();
    for category in Category::ALL {
        let mut metrics = Map::new();
        for (metric, elections) in model.summary.metrics(category).iter() {
            let per_election: Map<String, Value> = elections
                .iter()
                .map(|(e, s)| {
                    let leaf = json!({
                        "mean": opt(s.mean),
                        "sd": opt(s.sd),
                        "min": opt(s.min),
                        "max": opt(s.max),
                    });
                    (e.to_string(), leaf)
                })
                .collect();
            metrics.insert(metric.to_string(), Value::Object(per_election));
        }
        if !metrics.is_empty() {
            sds.insert(category.as_str().to_string(), Value::Object(metrics));
        }
    }
    doc.insert("sds".to_string(), Value::Object(sds));
    Value::Object(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn summary_over_areas_skips_nulls() {
        let mut m = Model::default();
        for (id, v) in [("a", Some(1.0)), ("b", Some(3.0)), ("c", None), ("d", Some(5.0))] {
            m.areas.entry_or_default(id).set(Category::Votes, "X", "e", v);
        }
        let s = population_summary(&m, Category::Votes, "X", "e").unwrap();
        assert_eq!(s.mean, Some(3.0));
        assert_eq!(s.sd, Some(2.0));
        assert_eq!(s.min, Some(1.0));
        assert_eq!(s.max, Some(5.0));
        assert_eq!(population_summary(&m, Category::Votes, "Y", "e"), None);
    }

    #[test]
    fn recency_halves_per_halflife() {
        let plan = WeightingPlan::new(date(2024, 10, 13), vec![]);
        assert_eq!(plan.recency(date(2024, 10, 13)), 1.0);
        let four_years_back = date(2024, 10, 13) - chrono::Duration::days(1461);
        assert!((plan.recency(four_years_back) - 0.5).abs() < 1e-12);
    }
}
