use super::types::SuiteResults;
use crate::runner::state::{ScenarioStateReport, ScenarioStatus};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

/// Generate JUnit XML from suite results, one testsuite per group
pub fn generate_junit_xml(results: &SuiteResults) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let total_tests = results.scenarios.len();
    let total_failures = results
        .scenarios
        .iter()
        .filter(|s| s.status == ScenarioStatus::Failed)
        .count();
    let total_skipped = results
        .scenarios
        .iter()
        .filter(|s| s.status == ScenarioStatus::Skipped)
        .count();
    let total_duration: u64 = results
        .scenarios
        .iter()
        .map(|s| s.duration_ms.unwrap_or(0))
        .sum();

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "shopcheck-run"));
    suites_start.push_attribute(("tests", total_tests.to_string().as_str()));
    suites_start.push_attribute(("failures", total_failures.to_string().as_str()));
    suites_start.push_attribute(("skipped", total_skipped.to_string().as_str()));
    suites_start.push_attribute((
        "time",
        (total_duration as f64 / 1000.0).to_string().as_str(),
    ));
    writer.write_event(Event::Start(suites_start))?;

    // Groups in declared order
    let mut group_names: Vec<&str> = Vec::new();
    for scenario in &results.scenarios {
        if !group_names.contains(&scenario.group_name.as_str()) {
            group_names.push(&scenario.group_name);
        }
    }

    for group_name in group_names {
        let scenarios: Vec<&ScenarioStateReport> = results
            .scenarios
            .iter()
            .filter(|s| s.group_name == group_name)
            .collect();

        let failures = scenarios
            .iter()
            .filter(|s| s.status == ScenarioStatus::Failed)
            .count();
        let skipped = scenarios
            .iter()
            .filter(|s| s.status == ScenarioStatus::Skipped)
            .count();
        let duration: u64 = scenarios.iter().map(|s| s.duration_ms.unwrap_or(0)).sum();

        let mut suite_start = BytesStart::new("testsuite");
        suite_start.push_attribute(("name", group_name));
        suite_start.push_attribute(("tests", scenarios.len().to_string().as_str()));
        suite_start.push_attribute(("failures", failures.to_string().as_str()));
        suite_start.push_attribute(("skipped", skipped.to_string().as_str()));
        suite_start.push_attribute(("id", results.session_id.as_str()));
        suite_start.push_attribute(("time", (duration as f64 / 1000.0).to_string().as_str()));
        suite_start.push_attribute(("timestamp", results.generated_at.as_str()));
        writer.write_event(Event::Start(suite_start))?;

        for scenario in scenarios {
            write_test_case(&mut writer, scenario)?;
        }

        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    scenario: &ScenarioStateReport,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", scenario.scenario_name.as_str()));
    case_start.push_attribute(("classname", scenario.group_name.as_str()));
    case_start.push_attribute((
        "time",
        (scenario.duration_ms.unwrap_or(0) as f64 / 1000.0)
            .to_string()
            .as_str(),
    ));
    writer.write_event(Event::Start(case_start))?;

    match scenario.status {
        ScenarioStatus::Failed => {
            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute((
                "message",
                scenario.message.as_deref().unwrap_or("Unknown error"),
            ));
            fail_start.push_attribute(("type", "AssertionError"));
            writer.write_event(Event::Start(fail_start))?;

            // Observed page state helps diagnosis in CI
            if let Some(url) = &scenario.page_url {
                writer.write_event(Event::Text(BytesText::new(&format!("page url: {}", url))))?;
            }

            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
        ScenarioStatus::Skipped => {
            let mut skip_start = BytesStart::new("skipped");
            skip_start.push_attribute(("message", scenario.message.as_deref().unwrap_or("")));
            writer.write_event(Event::Start(skip_start))?;
            writer.write_event(Event::End(BytesEnd::new("skipped")))?;
        }
        _ => {}
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write JUnit report to the output directory
pub fn write_report(results: &SuiteResults, output_dir: &Path, stem: &str) -> Result<()> {
    let xml = generate_junit_xml(results)?;
    let path = output_dir.join(format!("{}_junit.xml", stem));
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}

/// Generate JUnit report for the report subcommand
pub async fn generate(results: &SuiteResults, output: Option<&Path>) -> Result<()> {
    let xml = generate_junit_xml(results)?;
    if let Some(path) = output {
        std::fs::write(path, xml)?;
        println!("JUnit report saved to: {}", path.display());
    } else {
        println!("{}", xml);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::RunSummary;

    fn scenario(
        name: &str,
        group: &str,
        status: ScenarioStatus,
        message: Option<&str>,
    ) -> ScenarioStateReport {
        ScenarioStateReport {
            scenario_name: name.to_string(),
            group_name: group.to_string(),
            status,
            steps: vec![],
            message: message.map(|s| s.to_string()),
            failed_step: None,
            page_url: None,
            driver_fault: false,
            duration_ms: Some(1500),
        }
    }

    #[test]
    fn test_generate_junit_xml() {
        let results = SuiteResults {
            session_id: "test-session".to_string(),
            suite_name: "storefront".to_string(),
            scenarios: vec![
                scenario("valid-login", "login", ScenarioStatus::Passed, None),
                scenario(
                    "checkout-payment",
                    "payment",
                    ScenarioStatus::Failed,
                    Some("Element not found"),
                ),
                scenario(
                    "out-of-stock",
                    "cart",
                    ScenarioStatus::Skipped,
                    Some("no out-of-stock item on the page"),
                ),
            ],
            summary: RunSummary {
                session_id: "test-session".to_string(),
                total_groups: 3,
                total_scenarios: 3,
                passed: 1,
                failed: 1,
                skipped: 1,
                total_duration_ms: Some(4500),
            },
            generated_at: "2023-01-01 12:00:00".to_string(),
        };

        let xml = generate_junit_xml(&results).expect("Failed to generate XML");

        assert!(xml.contains(r#"<testsuites name="shopcheck-run""#));
        assert!(xml.contains(r#"tests="3""#));
        assert!(xml.contains(r#"failures="1""#));
        assert!(xml.contains(r#"skipped="1""#));
        assert!(xml.contains(r#"<testsuite name="login""#));
        assert!(xml.contains(r#"<testcase name="valid-login""#));
        assert!(xml.contains(r#"message="Element not found""#));
        // Skipped scenarios are reported as skipped, not failed
        assert!(xml.contains(r#"<skipped message="no out-of-stock item on the page""#));
    }
}
