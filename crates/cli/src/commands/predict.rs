//! One-off prediction command

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, PredictRequest, PredictResponse};
use crate::output::{color_confidence, color_result, OutputFormat};

/// Send one patient record to POST /predict and render the outcome
pub async fn run_prediction(
    client: &ApiClient,
    request: &PredictRequest,
    format: OutputFormat,
) -> Result<()> {
    let response: PredictResponse = client.post("predict", request).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Table => {
            println!("{}", "Prediction".bold());
            println!("{}", "=".repeat(50));
            println!("Result:       {}", color_result(&response.result));
            println!("Class:        {}", response.prediction);
            println!("Confidence:   {}", color_confidence(response.confidence));
        }
    }

    Ok(())
}
