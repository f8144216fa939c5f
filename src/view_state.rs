//! Current selection (area, election, scale, theme, viewport) and its URL-fragment encoding.
//!
//! ### Format
//! `;`-joined `key:value` pairs, for example `apl:12-34-centras;election:2024_EP;abs:1`.
//! A field equal to its default is never written, and decoding a missing field yields the default,
//! so `encode(&defaults, &defaults)` is the empty string.
//!
//! | key        | field      | value                                |
//! |------------|------------|--------------------------------------|
//! | `apl`      | `area`     | district id with `:` replaced by `-` |
//! | `election` | `election` | election id                          |
//! | `abs`      | `absolute` | `0` / `1`                            |
//! | `style`    | `theme`    | theme id                             |
//! | `z`        | `zoom`     | float                                |
//! | `c`        | `center`   | `lat,lon` with 4 decimals            |

use crate::config::AppConfig;
use crate::theme::Theme;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

/// Separator inside district ids. It doubles as the pair separator here, so ids carry
/// [`AREA_SUBSTITUTE`] instead while encoded.
pub const AREA_DELIMITER: char = ':';
/// District ids never contain this character (their name slugs are stripped of it), which
/// keeps the substitution reversible.
pub const AREA_SUBSTITUTE: char = '-';

const KEY_AREA: &str = "apl";
const KEY_ELECTION: &str = "election";
const KEY_ABSOLUTE: &str = "abs";
const KEY_THEME: &str = "style";
const KEY_ZOOM: &str = "z";
const KEY_CENTER: &str = "c";

// Characters escaped when writing the fragment into a URL. The codec's own separators stay readable.
const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'%');

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub area: Option<String>,
    pub election: String,
    pub absolute: bool,
    pub theme: Theme,
    pub zoom: Option<f64>,
    /// `[lat, lon]`
    pub center: Option<[f64; 2]>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ViewState {
    /// Startup defaults. The viewport stays unset until the map reports it.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            area: None,
            election: config.default_election.clone(),
            absolute: false,
            theme: config.default_theme.clone(),
            zoom: None,
            center: None,
        }
    }

    pub fn with_area(self, area: Option<String>) -> Self {
        Self { area, ..self }
    }

    pub fn with_election(self, election: impl Into<String>) -> Self {
        Self {
            election: election.into(),
            ..self
        }
    }

    pub fn with_absolute(self, absolute: bool) -> Self {
        Self { absolute, ..self }
    }

    pub fn with_theme(self, theme: Theme) -> Self {
        Self { theme, ..self }
    }

    pub fn with_zoom(self, zoom: f64) -> Self {
        Self {
            zoom: Some(zoom),
            ..self
        }
    }

    pub fn with_center(self, center: [f64; 2]) -> Self {
        Self {
            center: Some(center),
            ..self
        }
    }

    /// The absolute scale only applies to themes that support it.
    pub fn absolute_active(&self) -> bool {
        self.absolute && self.theme.supports_absolute()
    }
}

fn encode_area(id: &str) -> String {
    id.replace(AREA_DELIMITER, &AREA_SUBSTITUTE.to_string())
}

fn decode_area(raw: &str) -> String {
    raw.replace(AREA_SUBSTITUTE, &AREA_DELIMITER.to_string())
}

fn format_center(c: [f64; 2]) -> String {
    format!("{:.4},{:.4}", c[0], c[1])
}

/// `c` at the precision the fragment stores, so a decoded center compares equal to it.
pub fn round_center(c: [f64; 2]) -> [f64; 2] {
    parse_center(&format_center(c)).unwrap_or(c)
}

/// Each field's serialized value, `None` for an unset optional.
fn fields(state: &ViewState) -> [(&'static str, Option<String>); 6] {
    [
        (KEY_AREA, state.area.as_deref().map(encode_area)),
        (KEY_ELECTION, Some(state.election.clone())),
        (
            KEY_ABSOLUTE,
            Some(if state.absolute { "1" } else { "0" }.to_string()),
        ),
        (KEY_THEME, Some(state.theme.id())),
        (KEY_ZOOM, state.zoom.map(|z| z.to_string())),
        (KEY_CENTER, state.center.map(format_center)),
    ]
}

/// Canonical fragment (without `#`) for `state`, omitting every field equal to `defaults`.
pub fn encode(state: &ViewState, defaults: &ViewState) -> String {
    fields(state)
        .into_iter()
        .zip(fields(defaults))
        .filter_map(|((key, value), (_, default))| match value {
            Some(v) if Some(&v) != default.as_ref() => Some(format!("{key}:{v}")),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Fragment ready for the address bar: `#` plus the percent-escaped encoding, or empty.
pub fn to_url_fragment(state: &ViewState, defaults: &ViewState) -> String {
    let raw = encode(state, defaults);
    if raw.is_empty() {
        return String::new();
    }
    format!("#{}", utf8_percent_encode(&raw, FRAGMENT))
}

/// Extract and unescape the fragment of a full URL or a bare `#...` string.
pub fn fragment_of(url: &str) -> String {
    let raw = match url.split_once('#') {
        Some((_, frag)) => frag,
        None => url,
    };
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn parse_center(raw: &str) -> Option<[f64; 2]> {
    let mut parts = raw.split(',').map(|p| p.trim().parse::<f64>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(lat)), Some(Ok(lon)), None) if lat.is_finite() && lon.is_finite() => {
            Some([lat, lon])
        }
        _ => None,
    }
}

/// Apply one `key:value` pair to `state`. Returns false when the pair is ignored.
fn apply_pair(state: &mut ViewState, key: &str, value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    match key {
        KEY_AREA => state.area = Some(decode_area(value)),
        KEY_ELECTION => state.election = value.to_string(),
        KEY_ABSOLUTE => match value.trim().parse::<i64>() {
            Ok(n) => state.absolute = n != 0,
            Err(_) => return false,
        },
        KEY_THEME => match Theme::from_id(value) {
            Some(theme) => state.theme = theme,
            None => return false,
        },
        KEY_ZOOM => match value.trim().parse::<f64>() {
            Ok(z) if z.is_finite() => state.zoom = Some(z),
            _ => return false,
        },
        KEY_CENTER => match parse_center(value) {
            Some(c) => state.center = Some(c),
            None => return false,
        },
        _ => return false,
    }
    true
}

/// Decode a fragment (with or without a leading `#`) on top of `defaults`.
///
/// Unknown keys, pairs without a `:` and values that do not parse are skipped one by one;
/// the rest of the fragment still applies.
pub fn decode(fragment: &str, defaults: &ViewState) -> ViewState {
    let mut state = defaults.clone();
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    for element in fragment.split(';').filter(|e| !e.is_empty()) {
        let mut parts = element.split(':');
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            log::debug!("ignoring malformed fragment pair {element:?}");
            continue;
        };
        if !apply_pair(&mut state, key, value) {
            log::debug!("ignoring fragment pair {element:?}");
        }
    }
    state
}

/// Receiver of a decoded view, driven field by field.
pub trait ViewSetters {
    fn set_theme(&mut self, theme: Theme);
    fn set_absolute(&mut self, absolute: bool);
    fn set_election(&mut self, election: &str);
    fn select_area(&mut self, area: Option<&str>);
    fn set_viewport(&mut self, center: [f64; 2], zoom: f64);
}

/// Decode `fragment` and push it into `target`.
///
/// Order is theme, scale, election, area, viewport, because later setters read what earlier
/// ones set. The viewport is only restored once the default viewport has been captured
/// from a live map (`defaults.zoom` and `defaults.center` are set).
pub fn apply<T: ViewSetters + ?Sized>(fragment: &str, defaults: &ViewState, target: &mut T) -> ViewState {
    let state = decode(fragment, defaults);
    target.set_theme(state.theme.clone());
    target.set_absolute(state.absolute);
    target.set_election(&state.election);
    target.select_area(state.area.as_deref());
    if defaults.zoom.is_some() && defaults.center.is_some() {
        if let (Some(center), Some(zoom)) = (state.center, state.zoom) {
            target.set_viewport(center, zoom);
        }
    }
    state
}
