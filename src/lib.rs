//! votemap
//!
//! Core of an electoral-district thematic map: turns per-district vote shares and ideological
//! scores into map colors, tooltips and charts, and keeps the current view in a URL fragment.
//! Pairs with the `votemap` CLI.
//!
//! ### Features
//! - Normalize the flat value table (and the nested summary document) into per-area records
//! - Color districts by one metric, by the two-axis political compass, or by the winning metric
//! - Population statistics, including a recency- and turnout-weighted cross-election summary
//! - Encode/decode the view (area, election, scale, theme, viewport) as a URL fragment
//!
//! ### Example
//! ```no_run
//! use votemap::{AppConfig, SuperlativeCache, StyleContext, Theme};
//!
//! let model = votemap::normalize::load_value_table_str(&std::fs::read_to_string("data.csv")?)?;
//! let config = AppConfig::default();
//! let ctx = StyleContext { model: Some(&model), config: &config, election: "2024_LRS", absolute: false };
//! let mut cache = SuperlativeCache::new();
//! for id in model.area_ids() {
//!     let style = votemap::style::style_for(&Theme::Compass, &ctx, &mut cache, id);
//!     println!("{id}: {}", style.fill_color);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod chart;
pub mod color;
pub mod config;
pub mod detail;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod session;
pub mod stats;
pub mod style;
pub mod superlative;
pub mod theme;
pub mod view_state;

pub use color::{Hsl, Rgb8};
pub use config::AppConfig;
pub use models::{AreaRecord, Category, Model, SummaryStats};
pub use session::{MapSurface, NullSurface, Session};
pub use style::{Style, StyleContext};
pub use superlative::SuperlativeCache;
pub use theme::{Palette, Theme};
pub use view_state::ViewState;
