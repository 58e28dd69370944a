//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use forecast_lib::{ColumnKind, ColumnSpec, Label, Outcome, RawValue, FORECAST_NOTE};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Outcome as JSON, with the human-readable summary under `text`
pub fn outcome_json(outcome: &Outcome) -> serde_json::Value {
    let mut value = serde_json::to_value(outcome).unwrap_or(serde_json::Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.insert("text".to_string(), outcome.render_text().into());
    }
    value
}

/// Print a prediction outcome in the requested format
pub fn print_outcome(outcome: &Outcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&outcome_json(outcome)) {
                println!("{}", json);
            }
        }
        OutputFormat::Table => match outcome {
            Outcome::Forecast(result) => {
                let phrase = match result.label {
                    Label::Yes => result.label.phrase().blue().bold(),
                    Label::No => result.label.phrase().green().bold(),
                };
                println!("{} {}", "Prediction:".bold(), phrase);
                println!(
                    "{} {}",
                    "Rain probability:".bold(),
                    color_probability(result.probability)
                );
                println!();
                print_info(FORECAST_NOTE);
            }
            Outcome::Failure { message, hint, .. } => {
                print_error(message);
                eprintln!("{}", hint);
            }
        },
    }
}

/// Color the rain probability by how decisive it is
pub fn color_probability(probability: f64) -> String {
    let formatted = format!("{:.1}%", probability * 100.0);
    if probability >= 0.7 {
        formatted.blue().to_string()
    } else if probability >= 0.3 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// "min .. max" for numeric columns, the option list for categorical ones
pub fn format_domain(spec: &ColumnSpec) -> String {
    match spec.kind {
        ColumnKind::Numeric => {
            let bound = |b: Option<f64>| b.map_or_else(|| "-".to_string(), |v| v.to_string());
            format!("{} .. {}", bound(spec.min), bound(spec.max))
        }
        ColumnKind::Categorical => {
            const SHOWN: usize = 6;
            if spec.options.len() > SHOWN {
                format!(
                    "{}, … ({} options)",
                    spec.options[..SHOWN].join(", "),
                    spec.options.len()
                )
            } else {
                spec.options.join(", ")
            }
        }
        ColumnKind::FreeText => "text".to_string(),
    }
}

pub fn format_value(value: &RawValue) -> String {
    match value {
        RawValue::Missing => "-".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_lib::{testing::fixture_bundle, PredictionResult, SchemaRegistry};

    #[test]
    fn test_outcome_json_carries_text() {
        let outcome = Outcome::Forecast(PredictionResult::new(Label::No, 0.25));
        let json = outcome_json(&outcome);
        assert_eq!(json["outcome"], "forecast");
        assert_eq!(json["text"], "Prediction: ⛅ No Rain\nRain probability: 25.0%");
    }

    #[test]
    fn test_format_domain() {
        let schema = SchemaRegistry::from_bundle(&fixture_bundle());
        assert_eq!(
            format_domain(schema.column("WindDir9am").unwrap()),
            "N, S, W"
        );
        let min_temp = schema.column("MinTemp").unwrap();
        assert!(format_domain(min_temp).contains(" .. "));
    }

    #[test]
    fn test_long_option_lists_are_shortened() {
        let mut spec = SchemaRegistry::from_bundle(&fixture_bundle())
            .column("WindDir9am")
            .unwrap()
            .clone();
        spec.options = (0..10).map(|i| format!("L{}", i)).collect();
        assert_eq!(
            format_domain(&spec),
            "L0, L1, L2, L3, L4, L5, … (10 options)"
        );
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&RawValue::Missing), "-");
        assert_eq!(format_value(&RawValue::Text("N".into())), "N");
    }
}
