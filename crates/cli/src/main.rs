//! Rain forecast CLI
//!
//! Inspect the artifact bundle's input schema and run predictions, either
//! against a local bundle or through a running forecast server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::predict::{self, parse_assignment, Assignments};
use forecast_lib::{ArtifactBundle, Forecaster};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

/// Rain forecast CLI
#[derive(Parser)]
#[command(name = "rainfc")]
#[command(author, version, about = "CLI for the Rain Forecast model bundle", long_about = None)]
pub struct Cli {
    /// Path to the artifact bundle (falls back to the config file, then models/aussie_rain.json)
    #[arg(long, global = true, env = "FORECAST_BUNDLE_PATH")]
    pub bundle: Option<String>,

    /// Forecast server URL for remote commands (can also be set via RAINFC_API_URL env var)
    #[arg(long, global = true, env = "RAINFC_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the bundle's input columns
    Schema,

    /// Predict rain tomorrow with the local bundle
    Predict(PredictArgs),

    /// Talk to a running forecast server
    #[command(subcommand)]
    Remote(RemoteCommands),
}

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// Show the server's input columns
    Schema,

    /// Predict rain tomorrow through the server's JSON API
    Predict(PredictArgs),
}

#[derive(Args, Clone)]
pub struct PredictArgs {
    /// Column value, repeatable (e.g. --set Location=Katherine --set MinTemp=23.2)
    #[arg(long = "set", value_name = "COL=VALUE", value_parser = parse_assignment)]
    pub values: Vec<(String, String)>,

    /// Declare "no data" for a numeric column, repeatable
    #[arg(long, value_name = "COL")]
    pub missing: Vec<String>,
}

impl From<PredictArgs> for Assignments {
    fn from(args: PredictArgs) -> Self {
        Self {
            values: args.values,
            missing: args.missing,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .init();
    }

    let config = config::Config::load()?;
    let format = cli.format;

    let outcome = match cli.command {
        Commands::Schema => {
            let forecaster = local_forecaster(&config.bundle_path(cli.bundle.as_deref()))?;
            commands::schema::show_schema(forecaster.schema(), format)?;
            None
        }
        Commands::Predict(args) => {
            let forecaster = local_forecaster(&config.bundle_path(cli.bundle.as_deref()))?;
            Some(predict::predict_local(&forecaster, &args.into(), format)?)
        }
        Commands::Remote(remote) => {
            let api_url = config.api_url(cli.api_url.as_deref());
            debug!(api_url = %api_url, "Using forecast server");
            let client = client::ApiClient::new(&api_url)?;
            match remote {
                RemoteCommands::Schema => {
                    let schema = client.schema().await?;
                    commands::schema::show_schema(&schema, format)?;
                    None
                }
                RemoteCommands::Predict(args) => {
                    Some(predict::predict_remote(&client, &args.into(), format).await?)
                }
            }
        }
    };

    Ok(match outcome {
        Some(outcome) if !outcome.is_forecast() => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn local_forecaster(bundle_path: &str) -> Result<Forecaster> {
    let bundle = ArtifactBundle::load(bundle_path)
        .with_context(|| format!("Failed to load artifact bundle from {}", bundle_path))?;
    debug!(version = bundle.version(), "Loaded bundle");
    Ok(Forecaster::new(Arc::new(bundle)))
}
