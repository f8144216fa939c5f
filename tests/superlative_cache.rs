use votemap::models::SummaryStats;
use votemap::normalize;
use votemap::superlative::{Mode, find_superlative};
use votemap::{Category, Model, SuperlativeCache};

fn model() -> Model {
    normalize::load_value_table_str(
        "\
id,TURNOUT|e,LSDP|e,TS-LKD|e,LVZS|e,LP|e
x,90,30,30,10,
y,50,5,40,40,
mean,60,20,20,20,20
sd,10,5,10,0,5
min,0,0,0,0,0
max,100,60,60,60,60
",
    )
    .unwrap()
}

#[test]
fn ties_keep_the_first_metric_and_turnout_never_wins() {
    let m = model();
    // TURNOUT 90 is the largest raw value but is skipped
    assert_eq!(
        find_superlative(&m, "x", Category::Votes, "e", Mode::Top),
        Some("LSDP")
    );
    assert_eq!(
        find_superlative(&m, "y", Category::Votes, "e", Mode::Top),
        Some("TS-LKD")
    );
}

#[test]
fn bias_mode_standardizes_and_skips_zero_sd() {
    let m = model();
    // x: LSDP z = 2, TS-LKD z = 1, LVZS has sd 0
    assert_eq!(
        find_superlative(&m, "x", Category::Votes, "e", Mode::Bias),
        Some("LSDP")
    );
    // y: LVZS would win on raw value, but its score is not finite
    assert_eq!(
        find_superlative(&m, "y", Category::Votes, "e", Mode::Bias),
        Some("TS-LKD")
    );
}

#[test]
fn absent_area_category_or_election_resolves_nothing() {
    let m = model();
    let mut cache = SuperlativeCache::new();
    assert_eq!(cache.resolve(&m, "nope", Category::Votes, "e", Mode::Top), None);
    assert_eq!(cache.resolve(&m, "x", Category::Values, "e", Mode::Top), None);
    assert_eq!(cache.resolve(&m, "x", Category::Votes, "other", Mode::Top), None);
    assert!(cache.is_empty());
}

#[test]
fn memoized_key_survives_summary_changes_until_invalidated() {
    let mut m = model();
    let mut cache = SuperlativeCache::new();
    let first = cache.resolve(&m, "x", Category::Votes, "e", Mode::Bias);
    assert_eq!(first.as_deref(), Some("LSDP"));

    m.summary.insert(
        Category::Votes,
        "LSDP",
        "e",
        SummaryStats {
            mean: Some(50.0),
            sd: Some(5.0),
            min: Some(0.0),
            max: Some(60.0),
        },
    );
    assert_eq!(cache.resolve(&m, "x", Category::Votes, "e", Mode::Bias), first);
    assert_eq!(cache.len(), 1);

    cache.invalidate();
    assert_eq!(
        cache.resolve(&m, "x", Category::Votes, "e", Mode::Bias).as_deref(),
        Some("TS-LKD")
    );
}

#[test]
fn modes_and_elections_are_cached_separately() {
    let m = model();
    let mut cache = SuperlativeCache::new();
    cache.resolve(&m, "y", Category::Votes, "e", Mode::Top);
    cache.resolve(&m, "y", Category::Votes, "e", Mode::Bias);
    cache.resolve(&m, "x", Category::Votes, "e", Mode::Top);
    assert_eq!(cache.len(), 3);
}
