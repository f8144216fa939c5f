use std::collections::BTreeMap;
use votemap::fetch::{Geometry, Loaded};
use votemap::normalize;
use votemap::view_state::ViewSetters;
use votemap::{AppConfig, Hsl, MapSurface, Palette, Session, Style, Theme};

const TABLE: &str = "\
id,LSDP|2024_LRS,LSDP|2020_LRS,TURNOUT|2024_LRS,lrecon|2024_LRS,galtan|2024_LRS
1:1:Centro,30,25,60,1,-1
1:2:Naujamiescio,10,15,40,-1,1
mean,20,20,50,0,0
sd,10,5,10,1,1
min,0,0,0,-2,-2
max,40,40,100,2,2
";

const GEOMETRY: &str = r#"{"type":"FeatureCollection","features":[
  {"type":"Feature","properties":{"index":"1:1:Centro","pavad":"Centro","sav_pav":"Vilniaus m."}},
  {"type":"Feature","properties":{"index":"1:2:Naujamiescio","pavad":"Naujamiesčio","sav_pav":"Vilniaus m."}}
]}"#;

/// Map stand-in that restyles a fixed list of features and records the result.
struct Features {
    ids: Vec<&'static str>,
    styles: BTreeMap<String, Style>,
    fragments: Vec<String>,
}

impl Features {
    fn new() -> Self {
        Self {
            ids: vec!["1:1:Centro", "1:2:Naujamiescio"],
            styles: BTreeMap::new(),
            fragments: Vec::new(),
        }
    }
}

impl MapSurface for Features {
    fn restyle(&mut self, style_of: &mut dyn FnMut(&str) -> Style) {
        for id in &self.ids {
            self.styles.insert(id.to_string(), style_of(id));
        }
    }
    fn set_view(&mut self, _center: [f64; 2], _zoom: f64) {}
    fn set_fragment(&mut self, fragment: &str) {
        self.fragments.push(fragment.to_string());
    }
}

fn config() -> AppConfig {
    AppConfig {
        palette: Palette::new()
            .with("grey", Hsl::new(0.0, 0.0, 60.0))
            .with("LSDP", Hsl::new(0.0, 80.0, 40.0))
            .with("TURNOUT", Hsl::new(60.0, 50.0, 40.0))
            .with("l-econ", Hsl::new(10.0, 60.0, 45.0))
            .with("r-econ", Hsl::new(220.0, 60.0, 45.0))
            .with("lgal", Hsl::new(90.0, 50.0, 40.0))
            .with("rgal", Hsl::new(180.0, 50.0, 40.0))
            .with("ltan", Hsl::new(0.0, 50.0, 40.0))
            .with("rtan", Hsl::new(270.0, 50.0, 40.0)),
        default_election: "2024_LRS".into(),
        ..AppConfig::default()
    }
}

fn loaded() -> Loaded {
    Loaded {
        model: normalize::load_value_table_str(TABLE).unwrap(),
        geometry: Geometry::from_json_str(GEOMETRY).unwrap(),
    }
}

#[test]
fn base_style_until_ready_then_restyled() {
    let cfg = config();
    let base = Style::base(&cfg.palette);
    let mut s = Session::new(cfg, Features::new());

    s.set_theme(Theme::bias("LSDP"));
    assert!(!s.is_ready());
    assert_eq!(s.surface().styles["1:1:Centro"], base);
    assert_eq!(s.feature_style("1:1:Centro"), base);
    assert_eq!(s.area_detail("1:1:Centro"), "");

    s.mark_ready(loaded());
    assert!(s.is_ready());
    let centro = s.surface().styles["1:1:Centro"];
    assert_ne!(centro, base);
    assert_eq!(centro.fill_color.hue, 0.0);
}

#[test]
fn setters_keep_the_fragment_current() {
    let mut s = Session::new(config(), Features::new());
    s.mark_ready(loaded());
    s.set_theme(Theme::Compass);
    s.set_absolute(true);
    s.select_area(Some("1:2:Naujamiescio"));
    assert_eq!(s.fragment(), "apl:1-2-Naujamiescio;abs:1;style:theme_compass");
    assert_eq!(
        s.surface().fragments.last().map(String::as_str),
        Some("apl:1-2-Naujamiescio;abs:1;style:theme_compass")
    );
    // (-1, 1) is the ltan quadrant
    assert_eq!(s.surface().styles["1:2:Naujamiescio"].fill_color.hue, 0.0);
}

#[test]
fn applied_fragment_drives_details_and_tooltips() {
    let mut s = Session::new(config(), Features::new());
    s.mark_ready(loaded());
    s.apply_fragment("https://example.org/#style:theme_LSDP;apl:1-1-Centro");
    assert_eq!(s.view().area.as_deref(), Some("1:1:Centro"));
    assert_eq!(s.area_detail("1:1:Centro"), "LSDP: 30% (+1 σ)");
    assert_eq!(
        s.tooltip("1:2:Naujamiescio"),
        "<strong>Naujamiesčio (Vilniaus m.)</strong><br>LSDP: 10% (-1 σ)"
    );

    s.set_theme(Theme::bias("TURNOUT"));
    assert_eq!(s.area_detail("1:1:Centro"), "Rinkėjų aktyvumas: 60% (+1 σ)");

    s.set_theme(Theme::Compass);
    assert_eq!(s.area_detail("1:1:Centro"), "Liberali dešinė (1,41 balo)");

    s.set_theme(Theme::bias("lrecon"));
    assert_eq!(s.area_detail("1:1:Centro"), "Laisva rinka (+1 balo nuo 0)");
}

#[test]
fn party_chart_lists_every_election_of_the_area() {
    let mut s = Session::new(config(), Features::new());
    s.mark_ready(loaded());
    assert!(s.chart_spec().is_none());

    s.apply_fragment("style:theme_LSDP;apl:1-1-Centro");
    let spec = s.chart_spec().unwrap();
    assert_eq!(spec["id"], "area-plot");
    assert_eq!(spec["data"]["type"], "bar");
    assert_eq!(
        spec["data"]["scaleX"]["labels"],
        serde_json::json!(["2024 Seimo", "2020 Seimo"])
    );
    assert_eq!(spec["data"]["series"][0]["values"], serde_json::json!([30.0, 25.0]));
    assert_eq!(spec["data"]["plot"]["styles"][0]["borderColor"], "hsl(0, 80%, 40%)");
    // base config survives the merge
    assert_eq!(spec["data"]["scaleY"]["label"]["text"], "%");
}

#[test]
fn compass_chart_has_dot_cloud_and_markers() {
    let mut s = Session::new(config(), Features::new());
    s.mark_ready(loaded());
    s.apply_fragment("style:theme_compass;apl:1-1-Centro");
    let spec = s.chart_spec().unwrap();
    let data = &spec["data"];
    assert_eq!(data["type"], "scatter");
    assert_eq!(data["scaleY"]["label"]["text"], "Reguliuojama rinka");
    assert_eq!(data["series"].as_array().unwrap().len(), 3);
    assert_eq!(data["series"][0]["values"], serde_json::json!([[1.0, -1.0]]));
    assert_eq!(
        data["series"][1]["values"],
        serde_json::json!([[1.0, -1.0], [-1.0, 1.0]])
    );
    assert_eq!(data["scaleX"]["markers"].as_array().unwrap().len(), 2);
    let color = data["series"][0]["marker"]["backgroundColor"].as_str().unwrap();
    assert!(color.starts_with('#') && color.len() == 7);
}
