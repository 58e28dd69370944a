//! Schema registry: column kinds, ordering and presentation metadata
//!
//! Presentation metadata (labels, bounds, defaults, help text) only affects
//! what a user sees. The pipeline never reads it.

use crate::bundle::ArtifactBundle;
use crate::models::RawValue;
use crate::transform::{CategoryProvider, UNKNOWN_CATEGORY};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a column is acquired and fed to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    /// Neither numeric nor categorical; collected verbatim
    FreeText,
}

impl ColumnKind {
    /// Same spelling as the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::FreeText => "free_text",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation overrides for one column, as stored in the bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnPresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<RawValue>,
}

impl ColumnPresentation {
    /// Fields set in `other` win
    fn merged(self, other: &ColumnPresentation) -> Self {
        Self {
            label: other.label.clone().or(self.label),
            help: other.help.clone().or(self.help),
            min: other.min.or(self.min),
            max: other.max.or(self.max),
            step: other.step.or(self.step),
            integer: other.integer.or(self.integer),
            default: other.default.clone().or(self.default),
        }
    }
}

/// Fully resolved description of one input column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub label: String,
    pub help: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    pub integer: bool,
    pub default: RawValue,
    /// Selectable values; categorical columns only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ColumnSpec {
    /// Whether `value` lies within the presentation range
    pub fn in_range(&self, value: f64) -> bool {
        self.min.map_or(true, |m| value >= m) && self.max.map_or(true, |m| value <= m)
    }
}

/// Read-only registry of the bundle's input columns, in training order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRegistry {
    columns: Vec<ColumnSpec>,
    bundle_version: String,
}

impl SchemaRegistry {
    pub fn from_bundle(bundle: &ArtifactBundle) -> Self {
        let columns = bundle
            .input_cols()
            .iter()
            .map(|name| {
                let kind = if bundle.numeric_cols().contains(name) {
                    ColumnKind::Numeric
                } else if bundle.categorical_cols().contains(name) {
                    ColumnKind::Categorical
                } else {
                    ColumnKind::FreeText
                };
                let presentation = builtin_presentation(name, kind).merged(
                    bundle
                        .presentation()
                        .get(name)
                        .unwrap_or(&ColumnPresentation::default()),
                );
                resolve(name, kind, presentation, bundle)
            })
            .collect();

        Self {
            columns,
            bundle_version: bundle.version().to_string(),
        }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn kind_of(&self, name: &str) -> ColumnKind {
        self.column(name).map_or(ColumnKind::FreeText, |c| c.kind)
    }

    pub fn bundle_version(&self) -> &str {
        &self.bundle_version
    }
}

fn resolve(
    name: &str,
    kind: ColumnKind,
    presentation: ColumnPresentation,
    provider: &dyn CategoryProvider,
) -> ColumnSpec {
    let options = match kind {
        ColumnKind::Categorical => match provider.categories_for(name) {
            Some(categories) => categories.to_vec(),
            None => vec![UNKNOWN_CATEGORY.to_string()],
        },
        _ => Vec::new(),
    };

    let integer = presentation.integer.unwrap_or(false);
    let default = match kind {
        ColumnKind::Numeric => match presentation.default {
            Some(RawValue::Number(v)) if integer => RawValue::Number(v.trunc()),
            Some(RawValue::Number(v)) => RawValue::Number(v),
            Some(RawValue::Missing) => RawValue::Missing,
            _ => RawValue::Number(0.0),
        },
        ColumnKind::Categorical => match presentation.default {
            Some(RawValue::Text(v)) if options.contains(&v) => RawValue::Text(v),
            _ => RawValue::Text(options[0].clone()),
        },
        ColumnKind::FreeText => match presentation.default {
            Some(RawValue::Text(v)) => RawValue::Text(v),
            Some(RawValue::Number(v)) => RawValue::Text(v.to_string()),
            _ => RawValue::Text(String::new()),
        },
    };

    ColumnSpec {
        name: name.to_string(),
        kind,
        label: presentation.label.unwrap_or_else(|| name.to_string()),
        help: presentation.help.unwrap_or_default(),
        min: presentation.min,
        max: presentation.max,
        step: presentation.step,
        integer,
        default,
        options,
    }
}

/// Documented example observation (Katherine, 2021-06-19)
const DEFAULT_EXAMPLE: &[(&str, Example)] = &[
    ("Date", Example::Text("2021-06-19")),
    ("Location", Example::Text("Katherine")),
    ("MinTemp", Example::Number(23.2)),
    ("MaxTemp", Example::Number(33.2)),
    ("Rainfall", Example::Number(10.2)),
    ("Evaporation", Example::Number(4.2)),
    ("Sunshine", Example::Number(0.0)),
    ("WindGustDir", Example::Text("NNW")),
    ("WindGustSpeed", Example::Number(52.0)),
    ("WindDir9am", Example::Text("NW")),
    ("WindDir3pm", Example::Text("NNE")),
    ("WindSpeed9am", Example::Number(13.0)),
    ("WindSpeed3pm", Example::Number(20.0)),
    ("Humidity9am", Example::Number(89.0)),
    ("Humidity3pm", Example::Number(58.0)),
    ("Pressure9am", Example::Number(1004.8)),
    ("Pressure3pm", Example::Number(1001.5)),
    ("Cloud9am", Example::Number(8.0)),
    ("Cloud3pm", Example::Number(5.0)),
    ("Temp9am", Example::Number(25.7)),
    ("Temp3pm", Example::Number(33.0)),
    ("RainToday", Example::Text("Yes")),
];

#[derive(Clone, Copy)]
enum Example {
    Number(f64),
    Text(&'static str),
}

const HELP_TEXTS: &[(&str, &str)] = &[
    ("MinTemp", "Minimum temperature during the day (°C)"),
    ("MaxTemp", "Maximum temperature during the day (°C)"),
    ("Rainfall", "Total rainfall during the day (mm)"),
    ("Evaporation", "Total evaporation during the day (mm)"),
    ("Sunshine", "Hours of sunshine during the day"),
    ("WindGustSpeed", "Wind gust speed (km/h)"),
    ("WindSpeed9am", "Wind speed at 9:00 (km/h)"),
    ("WindSpeed3pm", "Wind speed at 15:00 (km/h)"),
    ("Humidity9am", "Humidity at 9:00 (%)"),
    ("Humidity3pm", "Humidity at 15:00 (%)"),
    ("Pressure9am", "Atmospheric pressure at 9:00 (hPa)"),
    ("Pressure3pm", "Atmospheric pressure at 15:00 (hPa)"),
    ("Cloud9am", "Cloud cover at 9:00 (0-8)"),
    ("Cloud3pm", "Cloud cover at 15:00 (0-8)"),
    ("Temp9am", "Temperature at 9:00 (°C)"),
    ("Temp3pm", "Temperature at 15:00 (°C)"),
    ("Location", "Select the weather station"),
    ("WindGustDir", "Wind gust direction"),
    ("WindDir9am", "Wind direction at 9:00"),
    ("WindDir3pm", "Wind direction at 15:00"),
    ("RainToday", "Did it rain today?"),
];

/// (column, min, max) for continuous numeric inputs
const NUMERIC_BOUNDS: &[(&str, f64, f64)] = &[
    ("MinTemp", -10.0, 50.0),
    ("MaxTemp", -10.0, 50.0),
    ("Temp9am", -10.0, 50.0),
    ("Temp3pm", -10.0, 50.0),
    ("WindGustSpeed", 0.0, 150.0),
    ("WindSpeed9am", 0.0, 100.0),
    ("WindSpeed3pm", 0.0, 100.0),
    ("Rainfall", 0.0, 100.0),
    ("Evaporation", 0.0, 50.0),
    ("Sunshine", 0.0, 15.0),
    ("Pressure9am", 980.0, 1050.0),
    ("Pressure3pm", 980.0, 1050.0),
];

fn lookup<T: Copy>(table: &[(&str, T)], name: &str) -> Option<T> {
    table.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
}

/// Built-in presentation for the Australian weather columns
pub fn builtin_presentation(name: &str, kind: ColumnKind) -> ColumnPresentation {
    let help = lookup(HELP_TEXTS, name).map(str::to_string);
    let example = lookup(DEFAULT_EXAMPLE, name);

    if kind != ColumnKind::Numeric {
        return ColumnPresentation {
            help,
            default: example.map(|e| match e {
                Example::Number(v) => RawValue::Number(v),
                Example::Text(s) => RawValue::Text(s.to_string()),
            }),
            ..Default::default()
        };
    }

    let example = match example {
        Some(Example::Number(v)) => Some(v),
        _ => None,
    };

    let (label, min, max, step, integer, fallback) = if name.starts_with("Cloud") {
        (name.to_string(), 0.0, 8.0, 1.0, true, 4.0)
    } else if name.contains("Humidity") {
        (format!("{} (%)", name), 0.0, 100.0, 1.0, true, 60.0)
    } else if let Some((_, min, max)) = NUMERIC_BOUNDS.iter().find(|(k, _, _)| *k == name) {
        (name.to_string(), *min, *max, 0.1, false, 0.0)
    } else {
        (name.to_string(), 0.0, 100.0, 0.1, false, 0.0)
    };

    ColumnPresentation {
        label: Some(label),
        help,
        min: Some(min),
        max: Some(max),
        step: Some(step),
        integer: Some(integer),
        default: Some(RawValue::Number(example.unwrap_or(fallback))),
    }
}
