//! Input collection
//!
//! Builds one `RawInputRow` per request from whatever the presentation
//! layer gathered. No validation happens here beyond choosing the
//! acquisition mode per column; malformed values are rejected later, at the
//! prediction boundary.

use crate::models::{RawInputRow, RawValue};
use crate::schema::{ColumnKind, ColumnSpec, SchemaRegistry};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Anything that can answer "what did the user enter for this column?"
pub trait InputSource {
    /// `None` when the user left the column untouched; `Some(Missing)` when
    /// they explicitly declared "no data".
    fn value(&self, column: &str) -> Option<RawValue>;
}

impl InputSource for RawInputRow {
    fn value(&self, column: &str) -> Option<RawValue> {
        self.get(column).cloned()
    }
}

/// Text inputs plus per-column "no data" flags, as submitted by a form
#[derive(Debug, Clone, Default)]
pub struct FormInput {
    values: HashMap<String, String>,
    missing: HashSet<String>,
}

impl FormInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn mark_missing(&mut self, column: impl Into<String>) {
        self.missing.insert(column.into());
    }
}

impl InputSource for FormInput {
    fn value(&self, column: &str) -> Option<RawValue> {
        if self.missing.contains(column) {
            return Some(RawValue::Missing);
        }
        self.values.get(column).map(|v| RawValue::Text(v.clone()))
    }
}

/// Collects raw rows against a schema
pub struct InputCollector<'a> {
    schema: &'a SchemaRegistry,
}

impl<'a> InputCollector<'a> {
    pub fn new(schema: &'a SchemaRegistry) -> Self {
        Self { schema }
    }

    /// Read one value per input column
    pub fn collect(&self, source: &dyn InputSource) -> RawInputRow {
        let mut row = RawInputRow::new();
        for spec in self.schema.columns() {
            let value = match spec.kind {
                ColumnKind::Numeric => numeric_value(spec, source.value(&spec.name)),
                ColumnKind::Categorical => categorical_value(spec, source.value(&spec.name)),
                ColumnKind::FreeText => match source.value(&spec.name) {
                    Some(RawValue::Text(s)) => RawValue::Text(s),
                    Some(RawValue::Number(v)) => RawValue::Text(v.to_string()),
                    _ => spec.default.clone(),
                },
            };
            row.insert(spec.name.clone(), value);
        }
        row
    }

    /// The row a user would submit without touching any widget
    pub fn defaults(&self) -> RawInputRow {
        self.collect(&RawInputRow::new())
    }
}

fn numeric_value(spec: &ColumnSpec, input: Option<RawValue>) -> RawValue {
    let value = match input {
        Some(RawValue::Missing) => return RawValue::Missing,
        Some(RawValue::Number(v)) => v,
        Some(RawValue::Text(s)) if s.trim().is_empty() => return spec.default.clone(),
        Some(RawValue::Text(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            // "warm", "NaN", "inf": rejected at the prediction boundary
            _ => return RawValue::Text(s),
        },
        None => return spec.default.clone(),
    };
    if !spec.in_range(value) {
        debug!(column = %spec.name, value, "Numeric input outside presentation range");
    }
    RawValue::Number(value)
}

fn categorical_value(spec: &ColumnSpec, input: Option<RawValue>) -> RawValue {
    match input {
        Some(RawValue::Text(s)) => {
            if !spec.options.contains(&s) {
                debug!(
                    column = %spec.name,
                    value = %s,
                    "Categorical input outside fitted options"
                );
            }
            RawValue::Text(s)
        }
        Some(RawValue::Number(v)) => RawValue::Text(v.to_string()),
        _ => spec.default.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_bundle;

    fn schema() -> SchemaRegistry {
        SchemaRegistry::from_bundle(&fixture_bundle())
    }

    #[test]
    fn test_defaults_cover_every_column() {
        let schema = schema();
        let row = InputCollector::new(&schema).defaults();
        assert_eq!(row.len(), 5);
        assert_eq!(row.get("MinTemp"), Some(&RawValue::Number(23.2)));
        assert_eq!(row.get("RainToday"), Some(&RawValue::Text("Yes".into())));
    }

    #[test]
    fn test_no_data_flag_yields_missing_marker() {
        let schema = schema();
        let mut form = FormInput::new();
        form.set("Rainfall", "3.5");
        form.mark_missing("Rainfall");
        let row = InputCollector::new(&schema).collect(&form);
        assert_eq!(row.get("Rainfall"), Some(&RawValue::Missing));
    }

    #[test]
    fn test_numeric_text_is_parsed() {
        let schema = schema();
        let mut form = FormInput::new();
        form.set("MinTemp", "17.5");
        form.set("Humidity3pm", "");
        let row = InputCollector::new(&schema).collect(&form);
        assert_eq!(row.get("MinTemp"), Some(&RawValue::Number(17.5)));
        assert_eq!(row.get("Humidity3pm"), Some(&RawValue::Number(58.0)));
    }

    #[test]
    fn test_malformed_numeric_passes_through() {
        let schema = schema();
        let mut form = FormInput::new();
        form.set("MinTemp", "warm");
        let row = InputCollector::new(&schema).collect(&form);
        assert_eq!(row.get("MinTemp"), Some(&RawValue::Text("warm".into())));
    }

    #[test]
    fn test_non_finite_text_is_not_parsed() {
        let schema = schema();
        let mut form = FormInput::new();
        form.set("MinTemp", "NaN");
        form.set("Rainfall", "inf");
        let row = InputCollector::new(&schema).collect(&form);
        assert_eq!(row.get("MinTemp"), Some(&RawValue::Text("NaN".into())));
        assert_eq!(row.get("Rainfall"), Some(&RawValue::Text("inf".into())));
    }

    #[test]
    fn test_out_of_range_kept() {
        let schema = schema();
        let row = InputCollector::new(&schema)
            .collect(&RawInputRow::new().with("MinTemp", RawValue::Number(70.0)));
        assert_eq!(row.get("MinTemp"), Some(&RawValue::Number(70.0)));
    }

    #[test]
    fn test_unknown_category_passes_through() {
        let schema = schema();
        let mut form = FormInput::new();
        form.set("WindDir9am", "XYZ");
        let row = InputCollector::new(&schema).collect(&form);
        assert_eq!(row.get("WindDir9am"), Some(&RawValue::Text("XYZ".into())));
    }

    #[test]
    fn test_missing_categorical_falls_back_to_default() {
        let schema = schema();
        let row = InputCollector::new(&schema)
            .collect(&RawInputRow::new().with("RainToday", RawValue::Missing));
        assert_eq!(row.get("RainToday"), Some(&RawValue::Text("Yes".into())));
    }
}
