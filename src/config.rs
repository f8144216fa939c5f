//! Application configuration: the palette, value-axis poles, election catalog and label strings.
//!
//! Stored as JSON. Missing fields fall back to [`AppConfig::default`], which reproduces the
//! Lithuanian election map this crate was built for (minus the palette, which has to come
//! from the site's theme).

use crate::models::SUMMARY_ELECTION;
use crate::theme::{Palette, Theme};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// The two ends of an ideological axis: palette keys and display labels, negative end first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueAxis {
    pub poles: [String; 2],
    pub labels: [String; 2],
}

impl ValueAxis {
    fn new(poles: [&str; 2], labels: [&str; 2]) -> Self {
        Self {
            poles: poles.map(str::to_string),
            labels: labels.map(str::to_string),
        }
    }

    /// Index of the pole a signed deviation points at (`<= 0` is the negative pole).
    pub fn side(delta: f64) -> usize {
        if delta <= 0.0 { 0 } else { 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionOption {
    pub value: String,
    /// Phrase used in pickers, e.g. "2020 m. Seimo rinkimuose".
    pub label: String,
    /// Axis label used in charts, e.g. "2020 Seimo".
    pub short_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl ElectionOption {
    fn new(value: &str, label: &str, short_label: &str, date: Option<(i32, u32, u32)>) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            short_label: short_label.to_string(),
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        }
    }
}

/// Fixed strings used in area details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub turnout: String,
    pub points: String,
    pub from: String,
    pub left: String,
    pub right: String,
    pub liberal: String,
    pub conservative: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            turnout: "Rinkėjų aktyvumas".into(),
            points: "balo".into(),
            from: "nuo".into(),
            left: "kairė".into(),
            right: "dešinė".into(),
            liberal: "Liberali".into(),
            conservative: "Konservatyvi".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub palette: Palette,
    pub value_axes: BTreeMap<String, ValueAxis>,
    pub elections: Vec<ElectionOption>,
    pub default_theme: Theme,
    pub default_election: String,
    pub labels: Labels,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut value_axes = BTreeMap::new();
        value_axes.insert(
            "lrecon".to_string(),
            ValueAxis::new(
                ["l-econ", "r-econ"],
                ["Reguliuojama rinka", "Laisva rinka"],
            ),
        );
        value_axes.insert(
            "galtan".to_string(),
            ValueAxis::new(
                ["gal", "tan"],
                ["Asmens pasirinkimo laisvė", "Konservatyvumas ir tradicija"],
            ),
        );
        let elections = vec![
            ElectionOption::new(SUMMARY_ELECTION, "pagal rinkimų svertinį vidurkį", "Vidurkis", None),
            ElectionOption::new("2016_LRS", "2016 m. Seimo rinkimuose", "2016 Seimo", Some((2016, 10, 9))),
            ElectionOption::new("2019_EP", "2019 m. EP rinkimuose", "2019 EP", Some((2019, 5, 26))),
            ElectionOption::new("2020_LRS", "2020 m. Seimo rinkimuose", "2020 Seimo", Some((2020, 10, 11))),
            ElectionOption::new("2024_EP", "2024 m. EP rinkimuose", "2024 EP", Some((2024, 6, 9))),
            ElectionOption::new("2024_LRS", "2024 m. Seimo rinkimuose", "2024 Seimo", Some((2024, 10, 13))),
        ];
        Self {
            palette: Palette::new(),
            value_axes,
            elections,
            default_theme: Theme::default(),
            default_election: SUMMARY_ELECTION.to_string(),
            labels: Labels::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        let cfg = Self::from_json_str(&text)?;
        log::info!(
            "config loaded from {}: {} palette colors, {} elections",
            path.as_ref().display(),
            cfg.palette.len(),
            cfg.elections.len()
        );
        Ok(cfg)
    }

    pub fn value_axis(&self, metric: &str) -> Option<&ValueAxis> {
        self.value_axes.get(metric)
    }

    pub fn election(&self, value: &str) -> Option<&ElectionOption> {
        self.elections.iter().find(|e| e.value == value)
    }

    /// Chart label for an election id, falling back to the id itself.
    pub fn short_label<'a>(&'a self, value: &'a str) -> &'a str {
        self.election(value)
            .map(|e| e.short_label.as_str())
            .unwrap_or(value)
    }
}
