//! Rendering themes and the named color palette they draw from.

use crate::color::Hsl;
use crate::models::Category;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

const PREFIX: &str = "theme_";

/// What the map is colored by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Theme {
    /// One metric, shaded by how far it sits from the reference center.
    Bias { category: Category, metric: String },
    /// Flat color of the metric with the largest standardized deviation.
    MaxBias { category: Category },
    /// Flat color of the metric with the largest raw value.
    Top { category: Category },
    /// Two value axes combined into four quadrant colors.
    Compass,
}

/// Chart layout used for an area under a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFamily {
    Party,
    Compass,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::bias("lrecon")
    }
}

impl Theme {
    /// Single-metric theme, categorized by the metric name.
    pub fn bias(metric: &str) -> Self {
        Theme::Bias {
            category: Category::of_metric(metric),
            metric: metric.to_string(),
        }
    }

    /// Parse a theme id such as `theme_lrecon`, `theme_LSDP` or `theme_max_bias_party`.
    /// Any unreserved suffix names a single metric.
    pub fn from_id(id: &str) -> Option<Self> {
        let key = id.strip_prefix(PREFIX)?;
        let theme = match key {
            "" => return None,
            "compass" => Theme::Compass,
            "max_bias_party" => Theme::MaxBias {
                category: Category::Votes,
            },
            "max_bias_value" => Theme::MaxBias {
                category: Category::Values,
            },
            "top_party" => Theme::Top {
                category: Category::Votes,
            },
            "top_value" => Theme::Top {
                category: Category::Values,
            },
            metric => Theme::bias(metric),
        };
        Some(theme)
    }

    pub fn id(&self) -> String {
        let suffix = match self {
            Theme::Bias { metric, .. } => metric.as_str(),
            Theme::Compass => "compass",
            Theme::MaxBias {
                category: Category::Votes,
            } => "max_bias_party",
            Theme::MaxBias {
                category: Category::Values,
            } => "max_bias_value",
            Theme::Top {
                category: Category::Votes,
            } => "top_party",
            Theme::Top {
                category: Category::Values,
            } => "top_value",
        };
        format!("{PREFIX}{suffix}")
    }

    /// Themes that may be drawn against the fixed absolute scale instead of the population.
    pub fn supports_absolute(&self) -> bool {
        matches!(
            self,
            Theme::Compass
                | Theme::Bias {
                    category: Category::Values,
                    ..
                }
        )
    }

    pub fn chart_family(&self) -> ChartFamily {
        match self {
            Theme::Compass
            | Theme::Bias {
                category: Category::Values,
                ..
            }
            | Theme::MaxBias {
                category: Category::Values,
            }
            | Theme::Top {
                category: Category::Values,
            } => ChartFamily::Compass,
            _ => ChartFamily::Party,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl Serialize for Theme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.id())
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Theme::from_id(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("not a theme id: {s:?}")))
    }
}

/// Neutral grey used when the palette does not define `grey`.
pub const FALLBACK_GREY: Hsl = Hsl::new(0.0, 0.0, 60.0);

/// Named theme colors (party abbreviations, value poles, compass quadrants, `grey`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    colors: BTreeMap<String, Hsl>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, color: Hsl) -> Self {
        self.colors.insert(name.to_string(), color);
        self
    }

    pub fn insert(&mut self, name: &str, color: Hsl) {
        self.colors.insert(name.to_string(), color);
    }

    pub fn color(&self, name: &str) -> Option<Hsl> {
        let found = self.colors.get(name).copied();
        if found.is_none() {
            log::debug!("palette has no color named {name:?}");
        }
        found
    }

    pub fn complementary(&self, name: &str) -> Option<Hsl> {
        self.color(name).map(Hsl::complementary)
    }

    pub fn grey(&self) -> Hsl {
        self.colors.get("grey").copied().unwrap_or(FALLBACK_GREY)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TURNOUT;

    #[test]
    fn theme_ids_round_trip() {
        for id in [
            "theme_lrecon",
            "theme_galtan",
            "theme_compass",
            "theme_LSDP",
            "theme_TS-LKD",
            "theme_TURNOUT",
            "theme_max_bias_party",
            "theme_max_bias_value",
            "theme_top_party",
            "theme_top_value",
        ] {
            assert_eq!(Theme::from_id(id).unwrap().id(), id);
        }
        assert_eq!(Theme::from_id("lrecon"), None);
        assert_eq!(Theme::from_id("theme_"), None);
    }

    #[test]
    fn categorizes_metric_themes() {
        assert_eq!(
            Theme::from_id("theme_galtan"),
            Some(Theme::Bias {
                category: Category::Values,
                metric: "galtan".into()
            })
        );
        assert_eq!(
            Theme::from_id("theme_LSDP"),
            Some(Theme::Bias {
                category: Category::Votes,
                metric: "LSDP".into()
            })
        );
        assert_eq!(
            Theme::from_id("theme_TURNOUT"),
            Some(Theme::Bias {
                category: Category::Votes,
                metric: TURNOUT.into()
            })
        );
    }

    #[test]
    fn absolute_capable_themes() {
        assert!(Theme::default().supports_absolute());
        assert!(Theme::Compass.supports_absolute());
        assert!(!Theme::bias("LSDP").supports_absolute());
        assert!(!Theme::MaxBias { category: Category::Values }.supports_absolute());
    }

    #[test]
    fn palette_lookups() {
        let p = Palette::new().with("LSDP", Hsl::new(0.0, 80.0, 45.0));
        assert_eq!(p.color("LSDP"), Some(Hsl::new(0.0, 80.0, 45.0)));
        assert_eq!(p.complementary("LSDP"), Some(Hsl::new(180.0, 20.0, 75.0)));
        assert_eq!(p.color("LS"), None);
        assert_eq!(p.grey(), FALLBACK_GREY);

        let parsed: Palette = serde_json::from_str(r#"{"grey": "hsl(0, 0%, 50%)"}"#).unwrap();
        assert_eq!(parsed.grey(), Hsl::new(0.0, 0.0, 50.0));
    }
}
