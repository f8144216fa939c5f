//! Color models that turn an area's data into a map style.
//!
//! Four models are available, selected by [`Theme`]:
//! - **bias**: one metric, shaded from white toward a positive or negative anchor color by the
//!   distance of the value from the reference center;
//! - **compass**: two value axes, shaded toward one of four quadrant colors by the Euclidean
//!   distance from the center;
//! - **max-bias** / **top**: the flat color of the area's winning metric.
//!
//! All models fail soft: missing model, area, category, palette color or summary entry gives
//! [`Style::base`], the neutral grey style.

use crate::color::Hsl;
use crate::config::{AppConfig, ValueAxis};
use crate::models::{AreaRecord, Category, Model, SummaryStats};
use crate::superlative::{Mode, SuperlativeCache};
use crate::theme::{Palette, Theme};
use serde::Serialize;

/// Center and bounds of the fixed scale used in absolute mode.
pub const ABSOLUTE_CENTER: f64 = 0.0;
pub const ABSOLUTE_MIN: f64 = -2.0;
pub const ABSOLUTE_MAX: f64 = 2.0;

/// Horizontal and vertical axes of the compass.
pub const COMPASS_X: &str = "lrecon";
pub const COMPASS_Y: &str = "galtan";

/// Style handed to the map for one feature. Stroke and fill always share a color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub weight: f64,
    pub color: Hsl,
    pub opacity: f64,
    pub fill_color: Hsl,
    pub fill_opacity: f64,
}

impl Style {
    /// The neutral "no data" style.
    pub fn base(palette: &Palette) -> Self {
        let grey = palette.grey();
        Self {
            weight: 1.0,
            color: grey,
            opacity: 0.5,
            fill_color: grey,
            fill_opacity: 0.6,
        }
    }

    fn painted(self, color: Hsl) -> Self {
        Self {
            color,
            fill_color: color,
            ..self
        }
    }
}

/// Inputs shared by every color model for one render pass.
#[derive(Debug, Clone, Copy)]
pub struct StyleContext<'a> {
    /// `None` until data has loaded.
    pub model: Option<&'a Model>,
    pub config: &'a AppConfig,
    pub election: &'a str,
    /// Whether the fixed absolute scale is in effect for the current theme.
    pub absolute: bool,
}

impl<'a> StyleContext<'a> {
    pub fn base(&self) -> Style {
        Style::base(&self.config.palette)
    }

    fn area(&self, area_id: &str) -> Option<(&'a Model, &'a AreaRecord)> {
        let model = self.model?;
        Some((model, model.area(area_id)?))
    }

    /// Reference frame for one metric: the fixed scale in absolute mode, otherwise the
    /// population mean and range.
    pub fn frame(&self, category: Category, metric: &str, election: &str) -> Option<Frame> {
        if self.absolute {
            return Some(Frame::ABSOLUTE);
        }
        Frame::relative(self.model?.summary.get(category, metric, election)?)
    }
}

/// Center and domain one value is measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub center: f64,
    pub min: f64,
    pub max: f64,
}

impl Frame {
    pub const ABSOLUTE: Frame = Frame {
        center: ABSOLUTE_CENTER,
        min: ABSOLUTE_MIN,
        max: ABSOLUTE_MAX,
    };

    pub fn relative(stats: &SummaryStats) -> Option<Self> {
        Some(Self {
            center: stats.mean?,
            min: stats.min?,
            max: stats.max?,
        })
    }

    /// Distance from the center to the domain bound on the side `delta` points to.
    pub fn limit(&self, delta: f64) -> f64 {
        if delta <= 0.0 {
            (self.center - self.min).abs()
        } else {
            (self.max - self.center).abs()
        }
    }
}

/// Share of the available half-domain covered by `distance`. A zero distance is 0 even when
/// the limit is 0 too.
fn coverage(distance: f64, limit: f64) -> f64 {
    if distance == 0.0 { 0.0 } else { distance / limit }
}

/// Negative and positive anchor colors for a single metric.
fn anchors(config: &AppConfig, category: Category, metric: &str) -> Option<(Hsl, Hsl)> {
    let palette = &config.palette;
    match category {
        Category::Votes => {
            let own = palette.color(metric)?;
            Some((own.complementary(), own))
        }
        Category::Values => {
            let axis = config.value_axis(metric)?;
            Some((palette.color(&axis.poles[0])?, palette.color(&axis.poles[1])?))
        }
    }
}

/// One-dimensional bias model for `metric`, at `election` or the context's election.
pub fn bias_style(
    ctx: &StyleContext<'_>,
    area_id: &str,
    category: Category,
    metric: &str,
    election: Option<&str>,
) -> Style {
    let base = ctx.base();
    let Some((_, area)) = ctx.area(area_id) else {
        return base;
    };
    if area.category(category).is_none() {
        return base;
    }
    let Some((negative, positive)) = anchors(ctx.config, category, metric) else {
        return base;
    };
    let election = election.unwrap_or(ctx.election);

    let Some(value) = area
        .value(category, metric, election)
        .filter(|v| v.is_finite())
    else {
        return base.painted(negative.with_lightness(100.0));
    };
    let Some(frame) = ctx.frame(category, metric, election) else {
        log::debug!("{area_id}: no population summary for {category}/{metric}/{election}");
        return base;
    };
    let delta = value - frame.center;
    let anchor = if delta <= 0.0 { negative } else { positive };
    base.painted(anchor.faded(coverage(delta.abs(), frame.limit(delta))))
}

/// Palette key of the compass quadrant a pair of centered values falls in.
pub fn compass_quadrant(dx: f64, dy: f64) -> &'static str {
    match (dx <= 0.0, dy <= 0.0) {
        (true, true) => "lgal",
        (false, true) => "rgal",
        (true, false) => "ltan",
        (false, false) => "rtan",
    }
}

/// Two-dimensional compass model over the `lrecon` and `galtan` axes.
pub fn compass_style(ctx: &StyleContext<'_>, area_id: &str) -> Style {
    let base = ctx.base();
    let Some((_, area)) = ctx.area(area_id) else {
        return base;
    };
    if area.category(Category::Values).is_none() {
        return base;
    }
    let election = ctx.election;
    let (Some(x), Some(y)) = (
        area.value(Category::Values, COMPASS_X, election),
        area.value(Category::Values, COMPASS_Y, election),
    ) else {
        return base;
    };
    let (Some(fx), Some(fy)) = (
        ctx.frame(Category::Values, COMPASS_X, election),
        ctx.frame(Category::Values, COMPASS_Y, election),
    ) else {
        return base;
    };
    let (dx, dy) = (x - fx.center, y - fy.center);
    let Some(anchor) = ctx.config.palette.color(compass_quadrant(dx, dy)) else {
        return base;
    };
    let limit = fx.limit(dx).hypot(fy.limit(dy));
    base.painted(anchor.faded(coverage(dx.hypot(dy), limit)))
}

fn flat_style(
    ctx: &StyleContext<'_>,
    cache: &mut SuperlativeCache,
    area_id: &str,
    category: Category,
    mode: Mode,
) -> Style {
    let base = ctx.base();
    let Some((model, area)) = ctx.area(area_id) else {
        return base;
    };
    if area.category(category).is_none() {
        return base;
    }
    let election = ctx.election;
    let Some(key) = cache.resolve(model, area_id, category, election, mode) else {
        return base;
    };
    let color_key = match category {
        Category::Votes => key,
        Category::Values => {
            let Some(axis) = ctx.config.value_axis(&key) else {
                return base;
            };
            let Some(value) = area.value(category, &key, election) else {
                return base;
            };
            let side = match mode {
                Mode::Bias => model
                    .summary
                    .get(category, &key, election)
                    .and_then(|s| s.standardize(value))
                    .map(ValueAxis::side),
                Mode::Top => Some(ValueAxis::side(value - ABSOLUTE_CENTER)),
            };
            let Some(side) = side else {
                return base;
            };
            axis.poles[side].clone()
        }
    };
    match ctx.config.palette.color(&color_key) {
        Some(color) => base.painted(color),
        None => base,
    }
}

/// Flat color of the metric with the largest standardized deviation. For value axes the pole
/// follows the sign of that deviation.
pub fn max_bias_style(
    ctx: &StyleContext<'_>,
    cache: &mut SuperlativeCache,
    area_id: &str,
    category: Category,
) -> Style {
    flat_style(ctx, cache, area_id, category, Mode::Bias)
}

/// Flat color of the metric with the largest raw value. For value axes the pole follows the
/// sign of the raw value on the absolute scale.
pub fn top_style(
    ctx: &StyleContext<'_>,
    cache: &mut SuperlativeCache,
    area_id: &str,
    category: Category,
) -> Style {
    flat_style(ctx, cache, area_id, category, Mode::Top)
}

/// Style of one feature under `theme`.
pub fn style_for(
    theme: &Theme,
    ctx: &StyleContext<'_>,
    cache: &mut SuperlativeCache,
    area_id: &str,
) -> Style {
    match theme {
        Theme::Bias { category, metric } => bias_style(ctx, area_id, *category, metric, None),
        Theme::MaxBias { category } => max_bias_style(ctx, cache, area_id, *category),
        Theme::Top { category } => top_style(ctx, cache, area_id, *category),
        Theme::Compass => compass_style(ctx, area_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.palette = Palette::new()
            .with("grey", Hsl::new(0.0, 0.0, 50.0))
            .with("LSDP", Hsl::new(0.0, 80.0, 40.0))
            .with("l-econ", Hsl::new(10.0, 70.0, 30.0))
            .with("r-econ", Hsl::new(220.0, 70.0, 30.0));
        cfg
    }

    fn model(value: Option<f64>) -> Model {
        let mut m = Model::default();
        m.areas
            .entry_or_default("a")
            .set(Category::Votes, "LSDP", "e", value);
        m.summary.insert(
            Category::Votes,
            "LSDP",
            "e",
            SummaryStats {
                mean: Some(20.0),
                sd: Some(5.0),
                min: Some(0.0),
                max: Some(60.0),
            },
        );
        m
    }

    #[test]
    fn missing_model_area_or_category_is_base() {
        let cfg = config();
        let base = Style::base(&cfg.palette);
        let ctx = StyleContext {
            model: None,
            config: &cfg,
            election: "e",
            absolute: false,
        };
        assert_eq!(bias_style(&ctx, "a", Category::Votes, "LSDP", None), base);

        let m = model(Some(1.0));
        let ctx = StyleContext { model: Some(&m), ..ctx };
        assert_eq!(bias_style(&ctx, "zzz", Category::Votes, "LSDP", None), base);
        assert_eq!(compass_style(&ctx, "a"), base);
        assert_eq!(base.weight, 1.0);
        assert_eq!(base.opacity, 0.5);
    }

    #[test]
    fn relative_bias_uses_asymmetric_limits() {
        let cfg = config();
        // above: limit 40, below: limit 20
        let m = model(Some(40.0));
        let ctx = StyleContext {
            model: Some(&m),
            config: &cfg,
            election: "e",
            absolute: false,
        };
        let s = bias_style(&ctx, "a", Category::Votes, "LSDP", None);
        assert_eq!(s.color.hue, 0.0);
        assert!((s.color.lightness - (100.0 - 0.875 * 60.0)).abs() < 1e-9);
        assert_eq!(s.color, s.fill_color);

        let m = model(Some(0.0));
        let ctx = StyleContext { model: Some(&m), ..ctx };
        let s = bias_style(&ctx, "a", Category::Votes, "LSDP", None);
        assert_eq!(s.color, Hsl::new(180.0, 20.0, 75.0));
    }

    #[test]
    fn non_finite_cell_paints_as_no_data() {
        let cfg = config();
        let m = model(Some(f64::NAN));
        let ctx = StyleContext {
            model: Some(&m),
            config: &cfg,
            election: "e",
            absolute: false,
        };
        let s = bias_style(&ctx, "a", Category::Votes, "LSDP", None);
        assert_eq!(s.fill_color.hue, 180.0);
        assert_eq!(s.fill_color.lightness, 100.0);
    }

    #[test]
    fn absolute_frame_ignores_population() {
        let f = Frame::ABSOLUTE;
        assert_eq!(f.limit(-0.1), 2.0);
        assert_eq!(f.limit(0.1), 2.0);
        let r = Frame::relative(&SummaryStats {
            mean: Some(1.0),
            sd: None,
            min: Some(-3.0),
            max: Some(2.0),
        })
        .unwrap();
        assert_eq!(r.limit(0.0), 4.0);
        assert_eq!(r.limit(0.5), 1.0);
    }

    #[test]
    fn quadrants_follow_sign_pairs() {
        assert_eq!(compass_quadrant(0.0, 0.0), "lgal");
        assert_eq!(compass_quadrant(1.0, -1.0), "rgal");
        assert_eq!(compass_quadrant(-1.0, 1.0), "ltan");
        assert_eq!(compass_quadrant(1.0, 1.0), "rtan");
    }

    #[test]
    fn style_serializes_for_the_map() {
        let cfg = config();
        let v = serde_json::to_value(Style::base(&cfg.palette)).unwrap();
        assert_eq!(v["color"], "hsl(0, 0%, 50%)");
        assert_eq!(v["fillColor"], "hsl(0, 0%, 50%)");
        assert_eq!(v["fillOpacity"], 0.6);
    }
}
