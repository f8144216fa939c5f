//! Build the in-memory [`Model`] from the two raw sources: the delimited value table and the
//! pre-aggregated summary document.
//!
//! ### Value table
//! ```text
//! id,LSDP|2020_LRS,lrecon|2020_LRS
//! 0001,42.5,-0.3
//! mean,30.1,0.1
//! sd,8.0,0.4
//! min,2.0,-1.5
//! max,61.0,1.7
//! ```
//! Every column after the first is `<metric>|<election>`. Rows keyed `mean`/`sd`/`min`/`max`
//! fill the [`PopulationSummary`](crate::models::PopulationSummary); every other row is an area.
//! Empty cells are `null`, never zero.
//!
//! Loads are all-or-nothing: any malformed input returns an error and leaves no partial model.

use crate::models::{Category, Cell, Model, PSEUDO_METRICS, STAT_KEYS, SUMMARY_ELECTION, SummaryStats};
use csv::ReaderBuilder;
use serde_json::Value;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("value table is empty")]
    EmptyTable,
    #[error("header column {index} ({column:?}) is not of the form <metric>|<election>")]
    BadColumn { index: usize, column: String },
    #[error("row {row} has {len} cells but the header only has {header_len}")]
    RowTooLong {
        row: usize,
        len: usize,
        header_len: usize,
    },
    #[error("row {row}, column {column}: {text:?} is not a number")]
    BadNumber {
        row: usize,
        column: String,
        text: String,
    },
    #[error("summary document: {0}")]
    Shape(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Split delimited text into rows of strings. No header handling happens here, and rows may
/// differ in length. The normalizer checks them.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<Vec<String>>, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Parse a delimited value table into a fresh model.
pub fn load_value_table_str(text: &str) -> Result<Model, LoadError> {
    load_value_table(&read_rows(text.as_bytes())?)
}

/// Build a fresh model from already-split rows.
pub fn load_value_table(rows: &[Vec<String>]) -> Result<Model, LoadError> {
    let mut model = Model::default();
    ingest_value_table(&mut model, rows)?;
    Ok(model)
}

#[derive(Debug)]
struct Column<'a> {
    name: &'a str,
    metric: &'a str,
    election: &'a str,
    category: Category,
}

fn parse_header(header: &[String]) -> Result<Vec<Column<'_>>, LoadError> {
    header
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, name)| {
            let (metric, election) = name
                .split_once('|')
                .filter(|(m, e)| !m.is_empty() && !e.is_empty())
                .ok_or_else(|| LoadError::BadColumn {
                    index,
                    column: name.clone(),
                })?;
            Ok(Column {
                name: name.as_str(),
                metric,
                election,
                category: Category::of_metric(metric),
            })
        })
        .collect()
}

fn parse_cell(text: &str, row: usize, column: &Column<'_>) -> Result<Option<f64>, LoadError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let value = text.parse::<f64>().map_err(|_| LoadError::BadNumber {
        row,
        column: column.name.to_string(),
        text: text.to_string(),
    })?;
    // `nan`/`inf` are how the exporting pipeline writes missing values
    if !value.is_finite() {
        log::debug!("row {row}, {}: non-finite {text:?} read as null", column.name);
        return Ok(None);
    }
    Ok(Some(value))
}

/// Add a value table to `model`. On error `model` is left untouched.
pub fn ingest_value_table(model: &mut Model, rows: &[Vec<String>]) -> Result<(), LoadError> {
    let (header, body) = rows.split_first().ok_or(LoadError::EmptyTable)?;
    let columns = parse_header(header)?;
    let mut next = model.clone();
    let mut areas = 0usize;

    for (r, row) in body.iter().enumerate() {
        let row_no = r + 1;
        if row.iter().all(|c| c.trim().is_empty()) {
            log::debug!("skipping blank row {row_no}");
            continue;
        }
        if row.len() > header.len() {
            return Err(LoadError::RowTooLong {
                row: row_no,
                len: row.len(),
                header_len: header.len(),
            });
        }
        let key = row[0].as_str();
        let stat = STAT_KEYS.contains(&key);
        if !stat {
            next.areas.entry_or_default(key);
            areas += 1;
        }
        for (text, column) in row[1..].iter().zip(&columns) {
            let value = parse_cell(text, row_no, column)?;
            if stat {
                next.summary
                    .entry(column.category, column.metric, column.election)
                    .set_field(key, value);
            } else if let Some(area) = next.areas.get_mut(key) {
                area.set(column.category, column.metric, column.election, value);
            }
        }
    }

    log::info!(
        "value table loaded: {} areas, {} columns",
        areas,
        columns.len()
    );
    *model = next;
    Ok(())
}

fn as_object<'a>(
    value: &'a Value,
    what: &str,
) -> Result<&'a serde_json::Map<String, Value>, LoadError> {
    value
        .as_object()
        .ok_or_else(|| LoadError::Shape(format!("{what} is not an object")))
}

/// The summary-election cell of a metric entry: either the leaf itself (`{"value": ..}`) or
/// the leaf nested under a `"summary"` key next to per-election entries.
fn summary_cell(entry: &Value) -> Option<Cell> {
    let obj = entry.as_object()?;
    let leaf = if obj.contains_key("value") {
        obj
    } else {
        obj.get(SUMMARY_ELECTION)?.as_object()?
    };
    match leaf.get("value")? {
        Value::Null => Some(Cell::new(None)),
        v => v.as_f64().map(|x| Cell::new(Some(x))),
    }
}

/// Merge a pre-built summary document into `model`.
///
/// Area entries land under the `"summary"` pseudo-election of each metric. A top-level `"sds"`
/// branch (`category -> metric -> election -> {mean, sd, min, max}`) replaces the matching
/// population statistics. On error `model` is left untouched.
pub fn merge_summary_document(model: &mut Model, doc: &Value) -> Result<(), LoadError> {
    let mut next = model.clone();
    for (area_id, area) in as_object(doc, "document")? {
        if area_id == "sds" {
            merge_sds(&mut next, area)?;
            continue;
        }
        for (cat_name, metrics) in as_object(area, &format!("area {area_id}"))? {
            let category = Category::parse(cat_name).ok_or_else(|| {
                LoadError::Shape(format!("area {area_id}: unknown category {cat_name:?}"))
            })?;
            let metrics = as_object(metrics, &format!("area {area_id}/{cat_name}"))?;
            let record = next.areas.entry_or_default(area_id);
            for (metric, entry) in metrics {
                if PSEUDO_METRICS.contains(&metric.as_str()) {
                    continue;
                }
                match summary_cell(entry) {
                    Some(cell) => record.set(category, metric, SUMMARY_ELECTION, cell.value),
                    None => {
                        return Err(LoadError::Shape(format!(
                            "area {area_id}/{cat_name}/{metric} has no summary value"
                        )));
                    }
                }
            }
        }
    }
    *model = next;
    Ok(())
}

fn merge_sds(model: &mut Model, sds: &Value) -> Result<(), LoadError> {
    for (cat_name, metrics) in as_object(sds, "sds")? {
        let category = Category::parse(cat_name)
            .ok_or_else(|| LoadError::Shape(format!("sds: unknown category {cat_name:?}")))?;
        for (metric, elections) in as_object(metrics, &format!("sds/{cat_name}"))? {
            for (election, stats) in as_object(elections, &format!("sds/{cat_name}/{metric}"))? {
                let stats: SummaryStats = serde_json::from_value(stats.clone())?;
                model.summary.insert(category, metric, election, stats);
            }
        }
    }
    Ok(())
}

/// Parse summary-document text and merge it into `model`.
pub fn merge_summary_str(model: &mut Model, text: &str) -> Result<(), LoadError> {
    let doc: Value = serde_json::from_str(text)?;
    merge_summary_document(model, &doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn nan_and_inf_cells_read_as_null() {
        let model = load_value_table(&rows(&[
            &["id", "A|e", "B|e", "C|e"],
            &["x", "nan", "90", "-inf"],
            &["mean", "10", "10", "NaN"],
            &["sd", "1", "1", "1"],
            &["min", "0", "0", "0"],
            &["max", "100", "100", "100"],
        ]))
        .unwrap();
        let area = model.area("x").unwrap();
        assert_eq!(area.value(Category::Votes, "A", "e"), None);
        assert!(area.cell(Category::Votes, "A", "e").is_some());
        assert_eq!(area.value(Category::Votes, "B", "e"), Some(90.0));
        assert_eq!(area.value(Category::Votes, "C", "e"), None);
        let c = model.summary.get(Category::Votes, "C", "e").unwrap();
        assert_eq!(c.mean, None);
        assert_eq!(c.sd, Some(1.0));
    }

    #[test]
    fn area_and_stat_rows_land_in_separate_places() {
        let model = load_value_table(&rows(&[
            &["id", "LSDP|2020_LRS", "lrecon|2020_LRS"],
            &["0001", "42.5", "-0.5"],
            &["mean", "30", "0.1"],
            &["sd", "5", "0.4"],
            &["min", "2", "-1.5"],
            &["max", "61", "1.7"],
        ]))
        .unwrap();

        assert_eq!(model.areas.len(), 1);
        let area = model.area("0001").unwrap();
        assert_eq!(area.value(Category::Votes, "LSDP", "2020_LRS"), Some(42.5));
        assert_eq!(area.value(Category::Values, "lrecon", "2020_LRS"), Some(-0.5));
        assert!(model.area("mean").is_none());

        let s = model
            .summary
            .get(Category::Votes, "LSDP", "2020_LRS")
            .unwrap();
        assert_eq!(
            *s,
            SummaryStats {
                mean: Some(30.0),
                sd: Some(5.0),
                min: Some(2.0),
                max: Some(61.0)
            }
        );
        let v = model
            .summary
            .get(Category::Values, "lrecon", "2020_LRS")
            .unwrap();
        assert_eq!(v.min, Some(-1.5));
        assert_eq!(v.max, Some(1.7));
    }

    #[test]
    fn empty_cell_is_null_not_zero() {
        let model = load_value_table(&rows(&[&["id", "LSDP|2020_LRS"], &["0001", ""]])).unwrap();
        let cell = model
            .area("0001")
            .unwrap()
            .cell(Category::Votes, "LSDP", "2020_LRS")
            .unwrap();
        assert_eq!(cell.value, None);
    }

    #[test]
    fn malformed_input_aborts_without_partial_state() {
        let mut model = load_value_table(&rows(&[&["id", "LSDP|2020_LRS"], &["0001", "1"]])).unwrap();
        let before = model.clone();

        let err = ingest_value_table(
            &mut model,
            &rows(&[&["id", "LSDP|2024_EP"], &["0002", "3"], &["0003", "abc"]]),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::BadNumber { row: 2, .. }));
        assert_eq!(model, before);

        let err = load_value_table(&rows(&[&["id", "LSDP"], &["0001", "1"]])).unwrap_err();
        assert!(matches!(err, LoadError::BadColumn { index: 1, .. }));

        let err = load_value_table(&rows(&[&["id", "LSDP|x"], &["0001", "1", "2"]])).unwrap_err();
        assert!(matches!(err, LoadError::RowTooLong { len: 3, .. }));

        assert!(matches!(load_value_table(&[]), Err(LoadError::EmptyTable)));
    }

    #[test]
    fn summary_document_merges_under_summary_election() {
        let mut model = load_value_table(&rows(&[&["id", "LSDP|2020_LRS"], &["0001", "40"]])).unwrap();
        let doc = serde_json::json!({
            "0001": {
                "votes": {
                    "LSDP": { "2020_LRS": {"value": 40.0}, "summary": {"value": 38.5, "bias": 1.0} },
                    "summary": { "max_bias_key": "LSDP", "min_bias_key": "LSDP" }
                },
                "values": { "lrecon": { "value": null } }
            },
            "sds": {
                "votes": { "LSDP": { "summary": { "mean": 30.0, "sd": 4.0, "min": 1.0, "max": 60.0 } } }
            }
        });
        merge_summary_document(&mut model, &doc).unwrap();

        let area = model.area("0001").unwrap();
        assert_eq!(area.value(Category::Votes, "LSDP", SUMMARY_ELECTION), Some(38.5));
        assert_eq!(area.value(Category::Votes, "LSDP", "2020_LRS"), Some(40.0));
        assert!(area.cell(Category::Values, "lrecon", SUMMARY_ELECTION).is_some());
        assert!(area.category(Category::Votes).unwrap().get("summary").is_none());
        assert_eq!(
            model
                .summary
                .get(Category::Votes, "LSDP", SUMMARY_ELECTION)
                .unwrap()
                .sd,
            Some(4.0)
        );
    }

    #[test]
    fn summary_document_rejects_non_objects() {
        let mut model = Model::default();
        let err = merge_summary_str(&mut model, r#"{"0001": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, LoadError::Shape(_)));
        assert!(model.areas.is_empty());
    }
}
