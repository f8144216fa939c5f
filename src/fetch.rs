//! One-shot loads of the value table and the area geometry.
//!
//! Either input may be an `http(s)` URL or a local path. [`load_all`] runs both loads at once
//! and only returns when both have succeeded, so a partial load never reaches the session.

use crate::models::Model;
use crate::normalize;
use anyhow::{Context, Result, bail};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    Path(PathBuf),
}

impl FromStr for Source {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Source::Url(s.to_string()))
        } else {
            Ok(Source::Path(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(u) => f.write_str(u),
            Source::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

fn http_client() -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(5))
        .user_agent(concat!("votemap/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")
}

/// Read the whole document as text.
pub fn fetch_text(source: &Source) -> Result<String> {
    match source {
        Source::Path(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display())),
        Source::Url(url) => {
            let resp = http_client()?
                .get(url)
                .send()
                .with_context(|| format!("GET {url}"))?;
            let status = resp.status();
            if !status.is_success() {
                bail!("GET {url}: HTTP {status}");
            }
            resp.text().with_context(|| format!("read body of {url}"))
        }
    }
}

/// Feature properties the map needs. Everything else in the geometry is left to the map.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeatureProps {
    #[serde(default, deserialize_with = "id_string")]
    pub index: Option<String>,
    #[serde(default)]
    pub pavad: Option<String>,
    #[serde(default)]
    pub sav_pav: Option<String>,
}

fn id_string<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl FeatureProps {
    /// Display title, `"<area name> (<municipality>)"`.
    pub fn title(&self) -> String {
        format!(
            "{} ({})",
            self.pavad.as_deref().unwrap_or_default(),
            self.sav_pav.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: FeatureProps,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

/// Properties of every feature in the geometry, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub features: Vec<FeatureProps>,
}

impl Geometry {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let fc: FeatureCollection =
            serde_json::from_str(text).context("geometry is not a FeatureCollection")?;
        Ok(Self {
            features: fc.features.into_iter().map(|f| f.properties).collect(),
        })
    }

    pub fn find(&self, area_id: &str) -> Option<&FeatureProps> {
        self.features
            .iter()
            .find(|f| f.index.as_deref() == Some(area_id))
    }

    /// Title of an area, empty when the geometry has no such feature.
    pub fn title(&self, area_id: &str) -> String {
        self.find(area_id).map(FeatureProps::title).unwrap_or_default()
    }
}

/// Both loaded inputs.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub model: Model,
    pub geometry: Geometry,
}

pub fn load_table(source: &Source) -> Result<Model> {
    let text = fetch_text(source)?;
    let model = normalize::load_value_table_str(&text)
        .with_context(|| format!("normalize value table from {source}"))?;
    log::info!("loaded {} areas from {source}", model.areas.len());
    Ok(model)
}

pub fn load_geometry(source: &Source) -> Result<Geometry> {
    let text = fetch_text(source)?;
    let geometry =
        Geometry::from_json_str(&text).with_context(|| format!("parse geometry from {source}"))?;
    log::info!("loaded {} features from {source}", geometry.features.len());
    Ok(geometry)
}

/// Load the value table and the geometry concurrently. Fails if either load fails.
pub fn load_all(table: &Source, geometry: &Source) -> Result<Loaded> {
    let (model, geometry) = thread::scope(|s| {
        let t = s.spawn(|| load_table(table));
        let g = s.spawn(|| load_geometry(geometry));
        (t.join(), g.join())
    });
    let model = match model {
        Ok(r) => r?,
        Err(_) => bail!("value table loader panicked"),
    };
    let geometry = match geometry {
        Ok(r) => r?,
        Err(_) => bail!("geometry loader panicked"),
    };
    Ok(Loaded { model, geometry })
}
