use super::types::SuiteResults;
use crate::runner::state::{ScenarioStatus, StepStatus};
use anyhow::Result;
use std::path::Path;

/// Generate HTML report
pub async fn generate(results: &SuiteResults, output: Option<&Path>) -> Result<()> {
    let html = generate_html(results);

    if let Some(path) = output {
        std::fs::write(path, html)?;
        println!("HTML report saved to: {}", path.display());
    } else {
        println!("{}", html);
    }

    Ok(())
}

/// Write HTML report to the output directory
pub fn write_report(results: &SuiteResults, output_dir: &Path, stem: &str) -> Result<()> {
    let path = output_dir.join(format!("{}_report.html", stem));
    std::fs::write(&path, generate_html(results))?;
    println!("    Generated HTML report: {}", path.display());
    Ok(())
}

fn generate_html(results: &SuiteResults) -> String {
    let summary = &results.summary;
    let pass_rate = if summary.total_scenarios > 0 {
        (summary.passed as f64 / summary.total_scenarios as f64 * 100.0) as u32
    } else {
        0
    };

    let mut scenarios_html = String::new();
    for scenario in &results.scenarios {
        let (status_text, status_class) = match scenario.status {
            ScenarioStatus::Passed => ("Passed", "passed"),
            ScenarioStatus::Failed => ("Failed", "failed"),
            ScenarioStatus::Skipped => ("Skipped", "skipped"),
            _ => ("Unknown", "pending"),
        };

        let mut steps_html = String::new();
        for step in &scenario.steps {
            let (status_icon, step_class) = match &step.status {
                StepStatus::Passed => ("✓", "passed"),
                StepStatus::Failed { .. } => ("✗", "failed"),
                StepStatus::Skipped { .. } => ("○", "skipped"),
                StepStatus::Running => ("⋯", "running"),
                StepStatus::Pending => ("○", "pending"),
            };

            let detail_html = match &step.status {
                StepStatus::Failed { error } => {
                    format!(r#"<div class="error-message">{}</div>"#, html_escape(error))
                }
                StepStatus::Skipped { reason } => {
                    format!(r#"<div class="skip-reason">{}</div>"#, html_escape(reason))
                }
                _ => String::new(),
            };

            let duration_html = step
                .duration_ms
                .map(|d| format!(r#"<span class="duration">{}ms</span>"#, d))
                .unwrap_or_default();

            steps_html.push_str(&format!(
                r#"
            <div class="step {step_class}">
                <span class="step-icon">{status_icon}</span>
                <span class="step-label">{}</span>
                {duration_html}
                {detail_html}
            </div>"#,
                html_escape(&step.label),
            ));
        }

        let diagnosis_html = if scenario.status == ScenarioStatus::Failed {
            let url = scenario
                .page_url
                .as_deref()
                .map(|u| format!("page url: {}", u))
                .unwrap_or_default();
            format!(
                r#"<div class="diagnosis">{} {}</div>"#,
                html_escape(scenario.message.as_deref().unwrap_or("")),
                html_escape(&url)
            )
        } else {
            String::new()
        };

        let duration_html = scenario
            .duration_ms
            .map(|d| format!(r#"<span class="duration">{}ms</span>"#, d))
            .unwrap_or_default();

        scenarios_html.push_str(&format!(
            r#"
        <details class="scenario {status_class}">
            <summary>
                <span class="badge {status_class}">{status_text}</span>
                <span class="scenario-name">{} / {}</span>
                {duration_html}
            </summary>
            {diagnosis_html}
            <div class="steps">{steps_html}</div>
        </details>"#,
            html_escape(&scenario.group_name),
            html_escape(&scenario.scenario_name),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>shopcheck report - {suite_name}</title>
<style>
  body {{ font-family: -apple-system, "Segoe UI", sans-serif; margin: 0; background: #f5f6f8; color: #222; }}
  header {{ background: #232a34; color: #fff; padding: 24px 32px; }}
  header h1 {{ margin: 0 0 4px 0; font-size: 20px; }}
  header .meta {{ color: #9aa4b2; font-size: 13px; }}
  .cards {{ display: flex; gap: 16px; padding: 24px 32px; }}
  .card {{ background: #fff; border-radius: 8px; padding: 16px 24px; box-shadow: 0 1px 3px rgba(0,0,0,0.08); }}
  .card .value {{ font-size: 28px; font-weight: 600; }}
  .card.passed .value {{ color: #2e9e5b; }}
  .card.failed .value {{ color: #d64545; }}
  .card.skipped .value {{ color: #c9862a; }}
  .scenarios {{ padding: 0 32px 32px; }}
  .scenario {{ background: #fff; border-radius: 8px; margin-bottom: 8px; padding: 8px 16px; box-shadow: 0 1px 3px rgba(0,0,0,0.08); }}
  .scenario summary {{ cursor: pointer; display: flex; align-items: center; gap: 12px; }}
  .badge {{ font-size: 11px; font-weight: 600; padding: 2px 8px; border-radius: 10px; text-transform: uppercase; }}
  .badge.passed {{ background: #e1f3e8; color: #2e9e5b; }}
  .badge.failed {{ background: #fae3e3; color: #d64545; }}
  .badge.skipped {{ background: #f7ecd8; color: #c9862a; }}
  .duration {{ color: #8a93a0; font-size: 12px; margin-left: auto; }}
  .steps {{ margin: 8px 0 4px 8px; }}
  .step {{ padding: 4px 0; font-size: 13px; display: flex; gap: 8px; align-items: baseline; }}
  .step.failed .step-icon {{ color: #d64545; }}
  .step.passed .step-icon {{ color: #2e9e5b; }}
  .step.skipped {{ color: #8a93a0; }}
  .error-message {{ color: #d64545; font-size: 12px; margin-left: 8px; }}
  .skip-reason {{ color: #8a93a0; font-size: 12px; margin-left: 8px; }}
  .diagnosis {{ color: #d64545; font-size: 13px; padding: 6px 0; }}
</style>
</head>
<body>
<header>
  <h1>{suite_name}</h1>
  <div class="meta">session {session_id} · generated {generated_at}</div>
</header>
<div class="cards">
  <div class="card"><div class="value">{total}</div>scenarios</div>
  <div class="card passed"><div class="value">{passed}</div>passed</div>
  <div class="card failed"><div class="value">{failed}</div>failed</div>
  <div class="card skipped"><div class="value">{skipped}</div>skipped</div>
  <div class="card"><div class="value">{pass_rate}%</div>pass rate</div>
</div>
<div class="scenarios">{scenarios_html}</div>
</body>
</html>
"#,
        suite_name = html_escape(&results.suite_name),
        session_id = html_escape(&results.session_id),
        generated_at = html_escape(&results.generated_at),
        total = summary.total_scenarios,
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::{RunSummary, ScenarioStateReport};

    #[test]
    fn report_contains_summary_and_scenarios() {
        let results = SuiteResults {
            session_id: "s1".to_string(),
            suite_name: "storefront".to_string(),
            scenarios: vec![ScenarioStateReport {
                scenario_name: "valid-login".to_string(),
                group_name: "login".to_string(),
                status: ScenarioStatus::Passed,
                steps: vec![],
                message: None,
                failed_step: None,
                page_url: None,
                driver_fault: false,
                duration_ms: Some(1200),
            }],
            summary: RunSummary {
                session_id: "s1".to_string(),
                total_groups: 1,
                total_scenarios: 1,
                passed: 1,
                failed: 0,
                skipped: 0,
                total_duration_ms: Some(1200),
            },
            generated_at: "2023-01-01 12:00:00".to_string(),
        };

        let html = generate_html(&results);
        assert!(html.contains("storefront"));
        assert!(html.contains("login / valid-login"));
        assert!(html.contains("100%"));
    }
}
