//! Schema listing

use anyhow::Result;
use colored::Colorize;
use forecast_lib::SchemaRegistry;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{format_domain, format_value, print_table, OutputFormat};

/// Row for the schema table
#[derive(Tabled, Serialize)]
struct ColumnRow {
    #[tabled(rename = "Column")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Range / Options")]
    domain: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Label")]
    label: String,
}

/// Print the column schema, in training order
pub fn show_schema(schema: &SchemaRegistry, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(schema)?);
        }
        OutputFormat::Table => {
            println!("{}", "Input Columns".bold());
            println!("Bundle: {}", schema.bundle_version().cyan());
            println!();

            print_table(&column_rows(schema), format);
        }
    }
    Ok(())
}

fn column_rows(schema: &SchemaRegistry) -> Vec<ColumnRow> {
    schema
        .columns()
        .iter()
        .map(|c| ColumnRow {
            name: c.name.clone(),
            kind: c.kind.to_string(),
            domain: format_domain(c),
            default: format_value(&c.default),
            label: c.label.clone(),
        })
        .collect()
}
