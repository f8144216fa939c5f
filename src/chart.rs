//! Chart configuration for the selected area, handed to the charting library as JSON.
//!
//! The output is the deep merge of three layers: a global base, a base for the chart family
//! (bar chart of one party across elections, or the political compass scatter), and the
//! per-area data.

use crate::models::{Category, Model};
use crate::style::{ABSOLUTE_MAX, COMPASS_X, COMPASS_Y, StyleContext, bias_style, compass_style};
use crate::superlative::{Mode, SuperlativeCache};
use crate::theme::{ChartFamily, Theme};
use ahash::AHashMap;
use serde_json::{Value, json};

/// Recursively merge `source` into `target`. Objects merge key by key, anything else replaces.
pub fn merge_deep(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(t), Value::Object(s)) => {
            for (key, value) in s {
                let slot = t.entry(key.clone()).or_insert(Value::Null);
                if slot.is_object() && value.is_object() {
                    merge_deep(slot, value);
                } else {
                    *slot = value.clone();
                }
            }
        }
        (t, s) => *t = s.clone(),
    }
}

fn global_base() -> Value {
    json!({
        "id": "area-plot",
        "data": {},
        "height": "400px",
        "output": "canvas",
        "locale": "lt",
        "plot": { "exact": true, "maxTrackers": 1 },
    })
}

fn party_base() -> Value {
    json!({
        "type": "bar",
        "scaleX": {
            "minValue": 0,
            "item": { "wrapText": true },
            "itemsOverlap": true,
        },
        "scaleY": { "label": { "text": "%" } },
        "tooltip": { "text": "%v%", "color": "#000", "backgroundColor": "#fff" },
        "plotarea": { "marginTop": 5 },
    })
}

fn hidden_scale(label: &str) -> Value {
    json!({
        "used": true,
        "placement": "opposite",
        "label": { "text": label },
        "lineWidth": 0,
        "tick": { "visible": false },
        "item": { "visible": false },
        "guide": { "visible": false },
    })
}

fn compass_scale(label: &str) -> Value {
    json!({
        "minValue": -ABSOLUTE_MAX,
        "maxValue": ABSOLUTE_MAX,
        "step": 1,
        "normalize": false,
        "lineWidth": 0,
        "tick": { "visible": false },
        "item": { "visible": false },
        "label": { "text": label },
        "guide": { "lineColor": "#eee" },
    })
}

fn compass_base(ctx: &StyleContext<'_>) -> Value {
    let labels = |axis: &str| -> [String; 2] {
        ctx.config
            .value_axis(axis)
            .map(|a| a.labels.clone())
            .unwrap_or_else(|| [String::new(), String::new()])
    };
    let [bottom, top] = labels(COMPASS_Y);
    let [left, right] = labels(COMPASS_X);
    json!({
        "type": "scatter",
        "scaleX": compass_scale(&bottom),
        "scaleX2": hidden_scale(&top),
        "scaleY": compass_scale(&left),
        "scaleY2": hidden_scale(&right),
        "plotarea": {
            "backgroundImage": "includes/compass.png",
            "backgroundFit": "xy",
            "backgroundRepeat": "no-repeat",
        },
        "tooltip": {
            "text": "Rinka ir valstybė: %kt <br>Visuomenė ir kultūra: %v",
            "color": "#000",
            "backgroundColor": "#fff",
            "rules": [{ "visible": false, "rule": "%data-bg > 0" }],
        },
    })
}

fn opt(v: Option<f64>) -> Value {
    v.map_or(Value::Null, |x| json!(x))
}

/// Compass points of every area, memoized per election.
#[derive(Debug, Default)]
pub struct CompassClouds {
    clouds: AHashMap<String, Value>,
}

impl CompassClouds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cloud(&mut self, model: &Model, election: &str) -> &Value {
        self.clouds.entry(election.to_string()).or_insert_with(|| {
            let points = model
                .areas
                .iter()
                .map(|(_, area)| {
                    json!([
                        opt(area.value(Category::Values, COMPASS_X, election)),
                        opt(area.value(Category::Values, COMPASS_Y, election)),
                    ])
                })
                .collect();
            Value::Array(points)
        })
    }

    /// Forget every cloud. Needed when the model is replaced.
    pub fn invalidate(&mut self) {
        self.clouds.clear();
    }
}

fn marker(position: f64, dashed: bool) -> Value {
    let mut m = json!({ "type": "line", "range": [position] });
    if dashed {
        merge_deep(
            &mut m,
            &json!({ "lineStyle": "dashed", "lineColor": "#666", "zIndex": 2 }),
        );
    }
    m
}

fn compass_area(
    ctx: &StyleContext<'_>,
    model: &Model,
    clouds: &mut CompassClouds,
    area_id: &str,
) -> Option<Value> {
    let area = model.area(area_id)?;
    let election = ctx.election;
    let color = compass_style(ctx, area_id).color.to_hex();
    let dot = json!({
        "values": [[
            opt(area.value(Category::Values, COMPASS_X, election)),
            opt(area.value(Category::Values, COMPASS_Y, election)),
        ]],
        "data-bg": 0,
        "marker": { "backgroundColor": color, "borderColor": "#000", "zIndex": 10 },
    });
    let mean = |axis: &str| {
        model
            .summary
            .get(Category::Values, axis, election)
            .and_then(|s| s.mean)
    };

    // The horizontal scale is offset by its half-width.
    let mut x_markers = vec![marker(ABSOLUTE_MAX, false)];
    x_markers.extend(mean(COMPASS_X).map(|m| marker(m + ABSOLUTE_MAX, true)));
    let mut y_markers = vec![marker(0.0, false)];
    y_markers.extend(mean(COMPASS_Y).map(|m| marker(m, true)));

    let cloud = json!({
        "values": clouds.cloud(model, election).clone(),
        "marker": { "size": 1, "borderWidth": 0, "backgroundColor": "#fff", "alpha": 0.25 },
        "data-bg": 1,
        "zIndex": 0,
    });
    Some(json!({
        "scaleX": { "markers": x_markers },
        "scaleY": { "markers": y_markers },
        "series": [dot.clone(), cloud, dot],
    }))
}

fn party_area(
    theme: &Theme,
    ctx: &StyleContext<'_>,
    model: &Model,
    cache: &mut SuperlativeCache,
    area_id: &str,
) -> Option<Value> {
    let party = match theme {
        Theme::Bias { metric, .. } => metric.clone(),
        Theme::MaxBias { category } => {
            cache.resolve(model, area_id, *category, ctx.election, Mode::Bias)?
        }
        Theme::Top { category } => {
            cache.resolve(model, area_id, *category, ctx.election, Mode::Top)?
        }
        Theme::Compass => return None,
    };
    let series = model.area(area_id)?.category(Category::Votes)?.get(&party)?;
    let border = ctx.config.palette.color(&party);

    let elections: Vec<&str> = series.keys().collect();
    let labels: Vec<&str> = elections
        .iter()
        .map(|e| ctx.config.short_label(*e))
        .collect();
    let styles: Vec<Value> = elections
        .iter()
        .map(|e| {
            let style = bias_style(ctx, area_id, Category::Votes, &party, Some(*e));
            json!({
                "backgroundColor": style.color.to_hex(),
                "borderColor": border,
                "borderWidth": 1,
            })
        })
        .collect();
    let values: Vec<Value> = series.iter().map(|(_, cell)| opt(cell.value)).collect();

    Some(json!({
        "scaleX": { "labels": labels, "maxItems": elections.len() },
        "plot": { "styles": styles },
        "series": [{ "values": values }],
    }))
}

/// Chart configuration for `area_id` under `theme`, or `None` when nothing can be charted
/// (no model yet, unknown area, no winning party).
pub fn chart_spec(
    theme: &Theme,
    ctx: &StyleContext<'_>,
    cache: &mut SuperlativeCache,
    clouds: &mut CompassClouds,
    area_id: &str,
) -> Option<Value> {
    let model = ctx.model?;
    model.area(area_id)?;
    let (base, area) = match theme.chart_family() {
        ChartFamily::Compass => (compass_base(ctx), compass_area(ctx, model, clouds, area_id)?),
        ChartFamily::Party => (party_base(), party_area(theme, ctx, model, cache, area_id)?),
    };
    let mut out = global_base();
    merge_deep(&mut out, &json!({ "data": base }));
    merge_deep(&mut out, &json!({ "data": area }));
    Some(out)
}
