use votemap::view_state::{decode, encode, fragment_of, to_url_fragment};
use votemap::{AppConfig, Category, Theme, ViewState};

fn themes() -> Vec<Theme> {
    vec![
        Theme::default(),
        Theme::bias("galtan"),
        Theme::bias("TURNOUT"),
        Theme::bias("TS-LKD"),
        Theme::Compass,
        Theme::MaxBias {
            category: Category::Votes,
        },
        Theme::MaxBias {
            category: Category::Values,
        },
        Theme::Top {
            category: Category::Votes,
        },
        Theme::Top {
            category: Category::Values,
        },
    ]
}

#[test]
fn every_combination_round_trips() {
    let d = ViewState::from_config(&AppConfig::default());
    for theme in themes() {
        for election in ["summary", "2016_LRS", "2024_EP"] {
            for absolute in [false, true] {
                for area in [None, Some("3:45:Zirmunu")] {
                    let s = d
                        .clone()
                        .with_theme(theme.clone())
                        .with_election(election)
                        .with_absolute(absolute)
                        .with_area(area.map(str::to_string))
                        .with_zoom(11.25)
                        .with_center([54.7123, 25.3001]);
                    let f = encode(&s, &d);
                    assert_eq!(decode(&f, &d), s, "fragment {f:?}");
                    assert_eq!(decode(&fragment_of(&to_url_fragment(&s, &d)), &d), s);
                }
            }
        }
    }
}

#[test]
fn default_state_encodes_to_empty() {
    let d = ViewState::from_config(&AppConfig::default());
    assert_eq!(encode(&d, &d), "");
    assert_eq!(decode("", &d), d);
}

#[test]
fn election_and_absolute_scenario() {
    let d = ViewState::from_config(&AppConfig::default());
    assert_eq!(d.election, "summary");
    assert!(!d.absolute);
    let s = d.clone().with_election("2024_EP").with_absolute(true);
    assert_eq!(encode(&s, &d), "election:2024_EP;abs:1");
}

#[test]
fn configured_defaults_are_elided() {
    let cfg = AppConfig::from_json_str(
        r#"{ "default_election": "2024_LRS", "default_theme": "theme_compass" }"#,
    )
    .unwrap();
    let d = ViewState::from_config(&cfg);
    let s = d.clone().with_theme(Theme::default());
    assert_eq!(encode(&s, &d), "style:theme_lrecon");
    assert_eq!(decode("election:2024_LRS", &d), d);
}

#[test]
fn absolute_only_applies_to_capable_themes() {
    let d = ViewState::default().with_absolute(true);
    assert!(d.absolute_active());
    assert!(d.clone().with_theme(Theme::Compass).absolute_active());
    assert!(!d.clone().with_theme(Theme::bias("LSDP")).absolute_active());
    assert!(
        !d.with_theme(Theme::MaxBias {
            category: Category::Values
        })
        .absolute_active()
    );
}
