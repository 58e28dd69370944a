//! Local and remote predictions

use anyhow::{bail, Result};
use forecast_lib::{Forecaster, FormInput, Outcome, RawInputRow, RawValue, SchemaRegistry};
use tracing::debug;

use crate::client::ApiClient;
use crate::output::{print_outcome, print_warning, OutputFormat};

/// Column assignments gathered from `--set` and `--missing`
#[derive(Debug, Clone, Default)]
pub struct Assignments {
    pub values: Vec<(String, String)>,
    pub missing: Vec<String>,
}

impl Assignments {
    /// Names that are not input columns of `schema`
    fn unknown_columns(&self, schema: &SchemaRegistry) -> Vec<String> {
        self.values
            .iter()
            .map(|(col, _)| col)
            .chain(self.missing.iter())
            .filter(|col| schema.column(col).is_none())
            .cloned()
            .collect()
    }

    fn check(&self, schema: &SchemaRegistry) -> Result<()> {
        let unknown = self.unknown_columns(schema);
        if !unknown.is_empty() {
            bail!("Unknown column(s): {}", unknown.join(", "));
        }
        for col in &self.missing {
            if schema.kind_of(col) != forecast_lib::ColumnKind::Numeric {
                print_warning(&format!(
                    "{} is not numeric; --missing falls back to its default",
                    col
                ));
            }
        }
        Ok(())
    }

    fn form_input(&self) -> FormInput {
        let mut form = FormInput::new();
        for (col, value) in &self.values {
            form.set(col.clone(), value.clone());
        }
        for col in &self.missing {
            form.mark_missing(col.clone());
        }
        form
    }

    /// Raw row for the JSON API; the server applies defaults
    fn raw_row(&self) -> RawInputRow {
        let mut row = RawInputRow::new();
        for (col, value) in &self.values {
            row.insert(col.clone(), RawValue::Text(value.clone()));
        }
        for col in &self.missing {
            row.insert(col.clone(), RawValue::Missing);
        }
        row
    }
}

/// Parse a `COL=VALUE` argument
pub fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((col, value)) if !col.trim().is_empty() => {
            Ok((col.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected COL=VALUE, got '{}'", arg)),
    }
}

/// Predict with a locally loaded bundle
pub fn predict_local(
    forecaster: &Forecaster,
    assignments: &Assignments,
    format: OutputFormat,
) -> Result<Outcome> {
    assignments.check(forecaster.schema())?;
    let row = forecaster.collect(&assignments.form_input());
    debug!(columns = row.len(), "Collected input row");

    let outcome = forecaster.submit(&row);
    print_outcome(&outcome, format);
    Ok(outcome)
}

/// Predict through a running forecast server
pub async fn predict_remote(
    client: &ApiClient,
    assignments: &Assignments,
    format: OutputFormat,
) -> Result<Outcome> {
    let schema = client.schema().await?;
    assignments.check(&schema)?;

    let outcome = client.predict(&assignments.raw_row()).await?;
    print_outcome(&outcome, format);
    Ok(outcome)
}
