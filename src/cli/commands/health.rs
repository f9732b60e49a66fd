use anyhow::Context;
use serde_json::Value;

use crate::cli::OutputFormat;

pub async fn handle(base_url: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("failed to reach {}", url))?;
    let status = response.status();
    let body: Value = response.json().await.context("invalid health response")?;

    match output_format {
        OutputFormat::Json => println!("{}", body),
        OutputFormat::Text => {
            let state = body["data"]["status"].as_str().unwrap_or("unknown");
            println!("{} {} ({})", url, state, status);
        }
    }

    if !status.is_success() {
        anyhow::bail!("server reported {}", status);
    }
    Ok(())
}
