use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use votemap::fetch::{self, Geometry, Loaded, Source};
use votemap::stats::{self, WeightingPlan};
use votemap::view_state::{self, ViewState};
use votemap::{AppConfig, NullSurface, Session, Theme, normalize};

#[derive(Parser, Debug)]
#[command(
    name = "votemap",
    version,
    about = "Color, describe and chart electoral districts from a value table"
)]
struct Cli {
    /// JSON configuration (palette, elections, labels). Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the style of every area for a view.
    Styles(StylesArgs),
    /// Print the detail line of one area.
    Detail(DetailArgs),
    /// Print the chart configuration of the selected area.
    Chart(ViewArgs),
    /// Encode a view as a URL fragment.
    Encode(EncodeArgs),
    /// Decode a URL fragment into a view.
    Decode(DecodeArgs),
    /// Write the weighted cross-election summary document.
    Summarize(SummarizeArgs),
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Value table (CSV path or http(s) URL).
    #[arg(short, long)]
    data: Source,
    /// Summary document merged on top of the table (path or URL).
    #[arg(long)]
    summary: Option<Source>,
    /// Geometry (GeoJSON path or URL); only used for area titles.
    #[arg(long)]
    geometry: Option<Source>,
    /// Recompute the population summary of the viewed election from the areas.
    #[arg(long, default_value_t = false)]
    recompute: bool,
}

#[derive(Args, Debug)]
struct ViewArgs {
    #[command(flatten)]
    data: DataArgs,
    /// View fragment, e.g. "style:theme_compass;election:2024_LRS".
    #[arg(short, long, default_value = "")]
    fragment: String,
}

#[derive(Args, Debug)]
struct StylesArgs {
    #[command(flatten)]
    view: ViewArgs,
    /// Write the styles here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DetailArgs {
    #[command(flatten)]
    view: ViewArgs,
    /// Area id, e.g. 12:34:Centro.
    #[arg(short, long)]
    area: String,
    /// Print the HTML tooltip (title and detail) instead of the bare detail.
    #[arg(long, default_value_t = false)]
    tooltip: bool,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    #[arg(long)]
    area: Option<String>,
    #[arg(long)]
    election: Option<String>,
    #[arg(long, default_value_t = false)]
    absolute: bool,
    /// Theme id, e.g. theme_compass or theme_LSDP.
    #[arg(long)]
    theme: Option<String>,
    #[arg(long)]
    zoom: Option<f64>,
    /// Map center as lat,lon.
    #[arg(long)]
    center: Option<String>,
    /// Print the percent-escaped `#...` form.
    #[arg(long, default_value_t = false)]
    url: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Fragment, `#fragment` or a full URL.
    fragment: String,
}

#[derive(Args, Debug)]
struct SummarizeArgs {
    #[command(flatten)]
    data: DataArgs,
    /// Elections to combine, separated by comma or semicolon.
    #[arg(long)]
    elections: String,
    /// Election whose date is the weighting reference. Defaults to the latest one.
    #[arg(long)]
    reference: Option<String>,
    /// Days after which an election's weight halves.
    #[arg(long, default_value_t = stats::DEFAULT_HALFLIFE_DAYS)]
    halflife: f64,
    /// Write the document here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn parse_center(s: &str) -> Result<[f64; 2]> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| anyhow!("invalid --center, expected lat,lon"))?;
    Ok([
        lat.trim().parse().context("invalid latitude")?,
        lon.trim().parse().context("invalid longitude")?,
    ])
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(p) => AppConfig::load(p).with_context(|| format!("load config {}", p.display())),
        None => Ok(AppConfig::default()),
    }
}

fn load_data(args: &DataArgs) -> Result<Loaded> {
    let mut loaded = match &args.geometry {
        Some(geometry) => fetch::load_all(&args.data, geometry)?,
        None => Loaded {
            model: fetch::load_table(&args.data)?,
            geometry: Geometry::default(),
        },
    };
    if let Some(summary) = &args.summary {
        let text = fetch::fetch_text(summary)?;
        normalize::merge_summary_str(&mut loaded.model, &text)
            .with_context(|| format!("merge summary document {summary}"))?;
    }
    Ok(loaded)
}

fn session(config: AppConfig, args: &ViewArgs) -> Result<Session<NullSurface>> {
    let mut loaded = load_data(&args.data)?;
    let mut session = Session::new(config, NullSurface);
    session.apply_fragment(&args.fragment);
    if args.data.recompute {
        stats::recompute_population_summary(&mut loaded.model, &session.view().election);
    }
    session.mark_ready(loaded);
    Ok(session)
}

fn write_json(value: &Value, out: Option<&PathBuf>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn view_json(view: &ViewState) -> Value {
    json!({
        "area": view.area,
        "election": view.election,
        "absolute": view.absolute,
        "theme": view.theme,
        "zoom": view.zoom,
        "center": view.center,
    })
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    match cli.cmd {
        Command::Styles(args) => cmd_styles(config, args),
        Command::Detail(args) => cmd_detail(config, args),
        Command::Chart(args) => cmd_chart(config, args),
        Command::Encode(args) => cmd_encode(config, args),
        Command::Decode(args) => cmd_decode(config, args),
        Command::Summarize(args) => cmd_summarize(config, args),
    }
}

fn cmd_styles(config: AppConfig, args: StylesArgs) -> Result<()> {
    let mut session = session(config, &args.view)?;
    let ids: Vec<String> = session
        .model()
        .map(|m| m.area_ids().map(str::to_string).collect())
        .unwrap_or_default();
    let mut styles = Map::new();
    for id in ids {
        let style = session.feature_style(&id);
        styles.insert(id, serde_json::to_value(style)?);
    }
    write_json(&Value::Object(styles), args.out.as_ref())
}

fn cmd_detail(config: AppConfig, args: DetailArgs) -> Result<()> {
    let mut session = session(config, &args.view)?;
    if session.model().and_then(|m| m.area(&args.area)).is_none() {
        bail!("unknown area: {}", args.area);
    }
    let text = if args.tooltip {
        session.tooltip(&args.area)
    } else {
        session.area_detail(&args.area)
    };
    println!("{text}");
    Ok(())
}

fn cmd_chart(config: AppConfig, args: ViewArgs) -> Result<()> {
    let mut session = session(config, &args)?;
    let spec = session
        .chart_spec()
        .ok_or_else(|| anyhow!("nothing to chart: select an area with apl:<id> in --fragment"))?;
    write_json(&spec, None)
}

fn cmd_encode(config: AppConfig, args: EncodeArgs) -> Result<()> {
    let defaults = ViewState::from_config(&config);
    let mut state = defaults
        .clone()
        .with_area(args.area)
        .with_absolute(args.absolute);
    if let Some(election) = args.election {
        state = state.with_election(election);
    }
    if let Some(id) = args.theme.as_deref() {
        let theme = Theme::from_id(id).ok_or_else(|| anyhow!("invalid --theme: {id}"))?;
        state = state.with_theme(theme);
    }
    if let Some(zoom) = args.zoom {
        state = state.with_zoom(zoom);
    }
    if let Some(center) = args.center.as_deref() {
        state = state.with_center(parse_center(center)?);
    }
    if args.url {
        println!("{}", view_state::to_url_fragment(&state, &defaults));
    } else {
        println!("{}", view_state::encode(&state, &defaults));
    }
    Ok(())
}

fn cmd_decode(config: AppConfig, args: DecodeArgs) -> Result<()> {
    let defaults = ViewState::from_config(&config);
    let state = view_state::decode(&view_state::fragment_of(&args.fragment), &defaults);
    write_json(&view_json(&state), None)
}

fn cmd_summarize(config: AppConfig, args: SummarizeArgs) -> Result<()> {
    let mut loaded = load_data(&args.data)?;
    let mut elections = Vec::new();
    for id in parse_list(&args.elections) {
        let date = config
            .election(&id)
            .and_then(|e| e.date)
            .ok_or_else(|| anyhow!("no date configured for election {id}"))?;
        elections.push((id, date));
    }
    if elections.is_empty() {
        bail!("--elections is empty");
    }
    let reference = match args.reference.as_deref() {
        Some(id) => config
            .election(id)
            .and_then(|e| e.date)
            .ok_or_else(|| anyhow!("no date configured for reference election {id}"))?,
        None => elections
            .iter()
            .map(|(_, d)| *d)
            .max()
            .ok_or_else(|| anyhow!("--elections is empty"))?,
    };
    let mut plan = WeightingPlan::new(reference, elections);
    plan.halflife_days = args.halflife;
    let written = stats::weighted_summary(&mut loaded.model, &plan);
    eprintln!("Weighted {written} area metrics");
    write_json(&stats::summary_document(&loaded.model), args.out.as_ref())
}
