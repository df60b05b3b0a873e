//! Diabetes Prediction API CLI
//!
//! A command-line client for the prediction service: health and
//! readiness probes, model information, evaluation metrics, and one-off
//! predictions.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{predict, status};

/// Diabetes Prediction API CLI
#[derive(Parser)]
#[command(name = "dpa")]
#[command(author, version, about = "CLI for the Diabetes Prediction API", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via DPA_API_URL env var)
    #[arg(long, env = "DPA_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check service liveness
    Health,

    /// Check service readiness (model loaded)
    Ready,

    /// Show model information
    Info,

    /// Show offline evaluation metrics for the trained models
    Metrics,

    /// Run a prediction for one patient record
    Predict {
        /// Number of times pregnant
        #[arg(long)]
        pregnancies: i64,

        /// Plasma glucose concentration (mg/dL)
        #[arg(long)]
        glucose: i64,

        /// Diastolic blood pressure (mm Hg)
        #[arg(long)]
        blood_pressure: i64,

        /// Triceps skinfold thickness (mm)
        #[arg(long)]
        skin_thickness: i64,

        /// 2-hour serum insulin (mu U/ml)
        #[arg(long)]
        insulin: i64,

        /// Body mass index (kg/m^2)
        #[arg(long)]
        bmi: f64,

        /// Diabetes pedigree function score
        #[arg(long)]
        pedigree: f64,

        /// Age in years
        #[arg(long)]
        age: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Health => {
            status::health(&client, cli.format).await?;
        }
        Commands::Ready => {
            status::ready(&client, cli.format).await?;
        }
        Commands::Info => {
            status::info(&client, cli.format).await?;
        }
        Commands::Metrics => {
            status::metrics(&client, cli.format).await?;
        }
        Commands::Predict {
            pregnancies,
            glucose,
            blood_pressure,
            skin_thickness,
            insulin,
            bmi,
            pedigree,
            age,
        } => {
            let request = client::PredictRequest {
                pregnancies,
                glucose,
                blood_pressure,
                skin_thickness,
                insulin,
                bmi,
                diabetes_pedigree_function: pedigree,
                age,
            };
            predict::run_prediction(&client, &request, cli.format).await?;
        }
    }

    Ok(())
}
