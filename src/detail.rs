//! Per-area description text shown in tooltips and the side panel.

use crate::config::ValueAxis;
use crate::models::{AreaRecord, Category, TURNOUT};
use crate::style::{ABSOLUTE_CENTER, COMPASS_X, COMPASS_Y, StyleContext};
use crate::superlative::{Mode, SuperlativeCache};
use crate::theme::Theme;

/// Round to two decimals, drop trailing zeros and use a decimal comma.
pub fn display_float(x: f64) -> String {
    let rounded = (x * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let s = format!("{rounded:.2}");
    s.trim_end_matches('0')
        .trim_end_matches('.')
        .replace('.', ",")
}

fn sign(x: f64) -> &'static str {
    if x > 0.0 { "+" } else { "" }
}

/// Escape text for HTML.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reference point of a metric: the fixed center in absolute mode, the population mean otherwise.
fn reference(ctx: &StyleContext<'_>, category: Category, metric: &str) -> Option<f64> {
    if ctx.absolute {
        return Some(ABSOLUTE_CENTER);
    }
    ctx.model?
        .summary
        .get(category, metric, ctx.election)?
        .mean
}

fn bias_detail(
    ctx: &StyleContext<'_>,
    area: &AreaRecord,
    category: Category,
    metric: &str,
) -> Option<String> {
    let reference = reference(ctx, category, metric)?;
    let delta = area.value(category, metric, ctx.election)? - reference;
    let label = match category {
        Category::Votes => metric.to_string(),
        Category::Values => ctx.config.value_axis(metric)?.labels[ValueAxis::side(delta)].clone(),
    };
    Some(format!(
        "{label} ({}{} {} {} {})",
        sign(delta),
        display_float(delta),
        ctx.config.labels.points,
        ctx.config.labels.from,
        display_float(reference)
    ))
}

fn party_detail(ctx: &StyleContext<'_>, area: &AreaRecord, party: &str) -> String {
    let label = if party == TURNOUT {
        ctx.config.labels.turnout.as_str()
    } else {
        party
    };
    let Some(value) = area.value(Category::Votes, party, ctx.election) else {
        return format!("{label}: —");
    };
    let score = ctx
        .model
        .and_then(|m| m.summary.get(Category::Votes, party, ctx.election))
        .and_then(|s| s.standardize(value));
    match score {
        Some(z) => format!(
            "{label}: {}% ({}{} σ)",
            display_float(value),
            sign(z),
            display_float(z)
        ),
        None => format!("{label}: {}%", display_float(value)),
    }
}

fn compass_detail(ctx: &StyleContext<'_>, area: &AreaRecord) -> Option<String> {
    let dx = area.value(Category::Values, COMPASS_X, ctx.election)?
        - reference(ctx, Category::Values, COMPASS_X)?;
    let dy = area.value(Category::Values, COMPASS_Y, ctx.election)?
        - reference(ctx, Category::Values, COMPASS_Y)?;
    let labels = &ctx.config.labels;
    let vertical = if dy <= 0.0 { &labels.liberal } else { &labels.conservative };
    let horizontal = if dx <= 0.0 { &labels.left } else { &labels.right };
    Some(format!(
        "{vertical} {horizontal} ({} {})",
        display_float(dx.hypot(dy)),
        labels.points
    ))
}

fn max_bias_detail(
    ctx: &StyleContext<'_>,
    cache: &mut SuperlativeCache,
    area_id: &str,
    area: &AreaRecord,
    category: Category,
) -> Option<String> {
    let model = ctx.model?;
    let key = cache.resolve(model, area_id, category, ctx.election, Mode::Bias)?;
    let value = area.value(category, &key, ctx.election)?;
    let mut score = model
        .summary
        .get(category, &key, ctx.election)?
        .standardize(value)?;
    let label = match category {
        Category::Votes => key,
        Category::Values => {
            let label = ctx.config.value_axis(&key)?.labels[ValueAxis::side(score)].clone();
            score = score.abs();
            label
        }
    };
    Some(format!("{label} ({}{} σ)", sign(score), display_float(score)))
}

/// Description of `area_id` under `theme`. Empty when the area or its data is missing.
pub fn area_detail(
    theme: &Theme,
    ctx: &StyleContext<'_>,
    cache: &mut SuperlativeCache,
    area_id: &str,
) -> String {
    let Some(area) = ctx.model.and_then(|m| m.area(area_id)) else {
        return String::new();
    };
    let detail = match theme {
        Theme::Bias {
            category: Category::Values,
            metric,
        } => bias_detail(ctx, area, Category::Values, metric),
        Theme::Bias {
            category: Category::Votes,
            metric,
        } => Some(party_detail(ctx, area, metric)),
        Theme::Compass => compass_detail(ctx, area),
        Theme::MaxBias { category } => max_bias_detail(ctx, cache, area_id, area, *category),
        Theme::Top { category } => ctx.model.and_then(|model| {
            let key = cache.resolve(model, area_id, *category, ctx.election, Mode::Top)?;
            match category {
                Category::Votes => Some(party_detail(ctx, area, &key)),
                Category::Values => bias_detail(ctx, area, Category::Values, &key),
            }
        }),
    };
    detail.unwrap_or_default()
}

/// Tooltip HTML: the bold area title, followed by the detail line when there is one.
pub fn tooltip(title: &str, detail: &str) -> String {
    let title = format!("<strong>{}</strong>", escape_html(title));
    if detail.is_empty() {
        title
    } else {
        format!("{title}<br>{}", escape_html(detail))
    }
}
