//! Health, readiness, model info and evaluation metrics commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthStatus, MetricsDocument, ModelInfo, Readiness};
use crate::output::{format_score, print_success, print_warning, OutputFormat};

/// Row for the per-model evaluation metrics table
#[derive(Tabled)]
struct ModelScoreRow {
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "Precision")]
    precision: String,
    #[tabled(rename = "Recall")]
    recall: String,
    #[tabled(rename = "F1")]
    f1: String,
}

/// Check service liveness
pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: HealthStatus = client.get("health").await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => {
            print_success(&format!("{} ({})", result.message, result.status));
        }
    }

    Ok(())
}

/// Check service readiness. A degraded service answers 503, which the
/// client surfaces as an error; report that as not-ready rather than
/// failing the command.
pub async fn ready(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: Result<Readiness> = client.get("readyz").await;

    match result {
        Ok(readiness) => match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&readiness)?);
            }
            OutputFormat::Table => {
                if readiness.ready {
                    print_success("Service is ready");
                } else {
                    print_warning(&format!(
                        "Service is not ready: {}",
                        readiness.reason.as_deref().unwrap_or("unknown")
                    ));
                }
            }
        },
        Err(err) => {
            print_warning(&format!("Service is not ready: {}", err));
        }
    }

    Ok(())
}

/// Show model information
pub async fn info(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: ModelInfo = client.get("info").await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => {
            println!("{}", "Model Information".bold());
            println!("{}", "=".repeat(50));
            println!("Model Type:   {}", result.model_type.cyan());
            println!("Dataset:      {}", result.dataset.cyan());
            println!("Features:     {}", result.features.join(", "));
        }
    }

    Ok(())
}

/// Show offline evaluation metrics as a per-model table
pub async fn metrics(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: MetricsDocument = client.get("metrics").await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Table => {
            println!("{}", "Evaluation Metrics".bold());
            println!("{}", "=".repeat(50));
            println!("Best Model:   {}", result.best_model.green().bold());
            println!();

            let mut rows: Vec<ModelScoreRow> = result
                .metrics
                .iter()
                .map(|(name, scores)| ModelScoreRow {
                    model: if *name == result.best_model {
                        name.green().bold().to_string()
                    } else {
                        name.clone()
                    },
                    accuracy: format_score(scores.accuracy),
                    precision: format_score(scores.precision),
                    recall: format_score(scores.recall),
                    f1: format_score(scores.f1_score),
                })
                .collect();
            rows.sort_by(|a, b| a.model.cmp(&b.model));

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
