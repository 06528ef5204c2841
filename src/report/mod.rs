pub mod html;
pub mod json;
pub mod junit;
pub mod types;

use anyhow::Result;
use std::path::Path;

use crate::runner::state::SessionState;
use types::SuiteResults;

/// Build report results from a finished session
pub fn build_results(session: &SessionState, suite_name: &str) -> SuiteResults {
    SuiteResults {
        session_id: session.session_id.clone(),
        suite_name: suite_name.to_string(),
        scenarios: session.scenarios.iter().map(|s| s.to_report()).collect(),
        summary: session.summary(),
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Write run artifacts into the output directory: the JSON results always,
/// JUnit and HTML when full reporting is enabled
pub fn write_all(results: &SuiteResults, output_dir: &Path, stem: &str, full: bool) -> Result<()> {
    let json_path = output_dir.join(format!("{}_results.json", stem));
    std::fs::write(&json_path, serde_json::to_string_pretty(results)?)?;
    println!("    Results saved to: {}", json_path.display());

    if full {
        junit::write_report(results, output_dir, stem)?;
        html::write_report(results, output_dir, stem)?;
    }
    Ok(())
}

/// Generate a report from saved JSON results
pub async fn generate_report(
    results_path: &Path,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let results = std::fs::read_to_string(results_path)?;
    let suite_results: SuiteResults = serde_json::from_str(&results)?;

    match format {
        "json" => json::generate(&suite_results, output).await,
        "html" => html::generate(&suite_results, output).await,
        "junit" => junit::generate(&suite_results, output).await,
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}
