//! Color math: HSL parsing/formatting, HSL -> RGB conversion and the easing curve
//! used to fade anchor colors toward white.
//!
//! Colors are kept as numeric [`Hsl`] records everywhere inside the crate and only
//! turned into strings at the render boundary (`Display`, [`Rgb8::to_hex`]).

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("not an HSL color: {0:?}")]
    Malformed(String),
}

/// HSL color. Hue in degrees, saturation and lightness in percent (0..=100).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsl {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

// Accepts `hsl(210, 50%, 40%)`, `hsl(210deg 50% 40%)` and the bare `210, 50%, 40%`
// form that CSS custom properties often hold.
static HSL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:hsla?\(\s*)?(-?\d+(?:\.\d+)?)(?:deg)?\s*[,\s]\s*(\d+(?:\.\d+)?)%?\s*[,\s]\s*(\d+(?:\.\d+)?)%?\s*\)?\s*$",
    )
    .expect("static HSL pattern")
});

impl Hsl {
    pub const fn new(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }

    /// Same hue and saturation, different lightness.
    pub fn with_lightness(self, lightness: f64) -> Self {
        Self { lightness, ..self }
    }

    /// The muted color on the opposite side of the wheel, used as the "below average" anchor
    /// for a party color: hue rotated by 180 degrees, saturation dropped to a low band and a
    /// fixed lightness of 75%.
    pub fn complementary(self) -> Self {
        let hue = (self.hue.trunc() as i64 + 180).rem_euclid(360) as f64;
        let saturation = if self.saturation.trunc() > 30.0 { 20.0 } else { 10.0 };
        Self::new(hue, saturation, 75.0)
    }

    /// Fade from white toward this color. `ratio` is the share of the available range the value
    /// covers. At 0 the result is 100% lightness. At 1 or more it is this color's own lightness.
    pub fn faded(self, ratio: f64) -> Self {
        let lightness = 100.0 - ease_out_cubic(ratio.min(1.0)) * (100.0 - self.lightness);
        self.with_lightness(lightness)
    }

    pub fn to_rgb8(self) -> Rgb8 {
        let h = self.hue;
        let s = (self.saturation / 100.0).clamp(0.0, 1.0);
        let l = (self.lightness / 100.0).clamp(0.0, 1.0);
        let a = s * l.min(1.0 - l);
        let channel = |n: f64| {
            let k = (n + h / 30.0).rem_euclid(12.0);
            let v = l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
            (v * 255.0).round().clamp(0.0, 255.0) as u8
        };
        Rgb8 {
            r: channel(0.0),
            g: channel(8.0),
            b: channel(4.0),
        }
    }

    pub fn to_hex(self) -> String {
        self.to_rgb8().to_hex()
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({}, {}%, {}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

impl FromStr for Hsl {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = HSL_RE
            .captures(s)
            .ok_or_else(|| ColorError::Malformed(s.to_string()))?;
        let num = |i: usize| {
            caps[i]
                .parse::<f64>()
                .map_err(|_| ColorError::Malformed(s.to_string()))
        };
        Ok(Self::new(num(1)?, num(2)?, num(3)?))
    }
}

impl Serialize for Hsl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hsl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Cubic ease-out: small inputs move quickly away from 0, large ones flatten toward 1.
pub fn ease_out_cubic(x: f64) -> f64 {
    1.0 - (1.0 - x).powi(3)
}
