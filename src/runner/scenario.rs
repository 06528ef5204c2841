use std::path::Path;

use super::context::SharedContext;
use super::error::RunError;
use super::events::{EventEmitter, RunEvent};
use super::executor::{self, AssertionOutcome, StepResult};
use super::resolver::{self, Resolution};
use super::state::{ScenarioState, StepState};
use crate::driver::traits::BrowserDriver;
use crate::parser::types::{Scenario, DEFAULT_PROBE_TIMEOUT_MS};

pub(crate) fn build_step_states(scenario: &Scenario) -> Vec<StepState> {
    let mut states: Vec<StepState> = scenario
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| StepState::new(i, &step.display_name()))
        .collect();
    states.push(StepState::new(
        scenario.steps.len(),
        &format!("assert {}", scenario.assert),
    ));
    states
}

/// Executes one scenario: steps strictly in order, stopping at the first
/// failed required step, then the trailing assertion. Runs exactly once per
/// invocation; no retries.
pub struct ScenarioRunner<'a> {
    pub driver: &'a dyn BrowserDriver,
    pub emitter: &'a EventEmitter,
    pub output_dir: &'a Path,
    pub snapshot: bool,
}

impl ScenarioRunner<'_> {
    pub async fn run(
        &self,
        group_name: &str,
        scenario: &Scenario,
        ctx: &mut SharedContext,
    ) -> ScenarioState {
        let mut state = ScenarioState::new(&scenario.name, group_name, build_step_states(scenario));
        state.start();

        self.emitter.emit(RunEvent::ScenarioStarted {
            scenario_name: scenario.name.clone(),
            group_name: group_name.to_string(),
            step_count: state.steps.len(),
        });

        if super::is_cancelled() {
            state.skip_remaining_steps(0, "interrupted");
            state.skip("interrupted".to_string());
            self.finish(&mut state);
            return state;
        }

        // Hard dependency on state established by an earlier scenario
        if let Some(capability) = &scenario.requires {
            if !ctx.has(capability) {
                let error = RunError::PreconditionFailed(capability.clone());
                state.skip_remaining_steps(0, "precondition failed");
                state.fail(error.to_string(), None);
                self.finish(&mut state);
                return state;
            }
        }

        // Probe for the condition this scenario needs on the page; absence
        // is a skip, not a failure
        if let Some(probe) = &scenario.skip_unless {
            let timeout_ms = probe.timeout.unwrap_or(DEFAULT_PROBE_TIMEOUT_MS);
            match resolver::resolve(self.driver, &probe.target, timeout_ms).await {
                Ok(Resolution::Found { .. }) => {}
                Ok(Resolution::NotFound) => {
                    let reason = probe
                        .reason
                        .clone()
                        .unwrap_or_else(|| format!("{} not present", probe.target));
                    state.skip_remaining_steps(0, &reason);
                    state.skip(reason);
                    self.finish(&mut state);
                    return state;
                }
                Err(e) => {
                    self.handle_failure(&mut state, 0, RunError::DriverFault(e), true)
                        .await;
                    self.finish(&mut state);
                    return state;
                }
            }
        }

        for (i, step) in scenario.steps.iter().enumerate() {
            if super::is_cancelled() {
                state.skip_remaining_steps(i, "interrupted");
                state.skip("interrupted".to_string());
                self.finish(&mut state);
                return state;
            }

            state.steps[i].start();
            self.emitter.emit(RunEvent::StepStarted {
                scenario_name: scenario.name.clone(),
                index: i,
                label: state.steps[i].label.clone(),
            });

            match executor::execute(step, ctx, self.driver).await {
                Ok(StepResult::Ok) => {
                    state.steps[i].pass();
                    self.emitter.emit(RunEvent::StepPassed {
                        scenario_name: scenario.name.clone(),
                        index: i,
                        duration_ms: state.steps[i].duration_ms.unwrap_or(0),
                    });
                }
                Ok(StepResult::SkippedOptional { reason }) => {
                    state.steps[i].skip(reason.clone());
                    self.emitter.emit(RunEvent::StepSkipped {
                        scenario_name: scenario.name.clone(),
                        index: i,
                        reason,
                    });
                }
                Ok(StepResult::FailedRequired(error)) => {
                    self.handle_failure(&mut state, i, error, false).await;
                    self.finish(&mut state);
                    return state;
                }
                Err(e) => {
                    self.handle_failure(&mut state, i, RunError::DriverFault(e), true)
                        .await;
                    self.finish(&mut state);
                    return state;
                }
            }
        }

        // Trailing assertion decides the verdict
        let assert_index = scenario.steps.len();
        state.steps[assert_index].start();
        self.emitter.emit(RunEvent::StepStarted {
            scenario_name: scenario.name.clone(),
            index: assert_index,
            label: state.steps[assert_index].label.clone(),
        });

        match executor::check_assertion(&scenario.assert, ctx, self.driver).await {
            Ok(AssertionOutcome::Matched { condition }) => {
                state.steps[assert_index].pass();
                self.emitter.emit(RunEvent::StepPassed {
                    scenario_name: scenario.name.clone(),
                    index: assert_index,
                    duration_ms: state.steps[assert_index].duration_ms.unwrap_or(0),
                });
                log::debug!("'{}' passed on {}", scenario.name, condition);

                state.page_url = self.driver.current_url().await.ok();
                state.pass();
                if let Some(capability) = &scenario.establishes {
                    ctx.grant(capability);
                }
            }
            Ok(AssertionOutcome::TimedOut) => {
                let timeout_ms = scenario.assert.timeout.unwrap_or(ctx.default_timeout_ms);
                let error = RunError::AssertionTimeout {
                    condition: scenario.assert.to_string(),
                    timeout_ms,
                };
                self.handle_failure(&mut state, assert_index, error, false)
                    .await;
            }
            Err(e) => {
                self.handle_failure(&mut state, assert_index, RunError::DriverFault(e), true)
                    .await;
            }
        }

        self.finish(&mut state);
        state
    }

    /// Record a step failure: diagnostics (page URL, optional screenshot),
    /// skip everything after it, set the verdict
    async fn handle_failure(
        &self,
        state: &mut ScenarioState,
        index: usize,
        error: RunError,
        driver_fault: bool,
    ) {
        let message = if driver_fault {
            format!("driver fault: {}", error)
        } else {
            error.to_string()
        };

        if state.steps[index].started_at.is_none() {
            state.steps[index].start();
        }
        state.steps[index].fail(message.clone());

        self.emitter.emit(RunEvent::StepFailed {
            scenario_name: state.scenario_name.clone(),
            index,
            error: message.clone(),
            duration_ms: state.steps[index].duration_ms.unwrap_or(0),
        });

        if !driver_fault {
            state.page_url = self.driver.current_url().await.ok();

            if self.snapshot {
                let safe_name: String = state
                    .scenario_name
                    .chars()
                    .map(|c| if c.is_alphanumeric() { c } else { '_' })
                    .collect();
                let path = self
                    .output_dir
                    .join(format!("failure_{}_{}.png", safe_name, index));
                match self.driver.screenshot(&path).await {
                    Ok(()) => {
                        state.steps[index].screenshot_path =
                            Some(path.to_string_lossy().to_string());
                    }
                    Err(e) => log::warn!("failed to capture failure screenshot: {}", e),
                }
            }
        }

        state.skip_remaining_steps(index + 1, "previous step failed");
        state.driver_fault = driver_fault;
        state.fail(message, Some(index));
    }

    fn finish(&self, state: &mut ScenarioState) {
        self.emitter.emit(RunEvent::ScenarioFinished {
            scenario_name: state.scenario_name.clone(),
            status: state.status.clone(),
            message: state.message.clone(),
            duration_ms: state.duration_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{ClickEffect, MockDriver, MockPage};
    use crate::parser::yaml::parse_suite;
    use crate::runner::state::{ScenarioStatus, StepStatus};
    use std::sync::Arc;

    fn scenario_from_yaml(yaml: &str) -> Scenario {
        let suite = parse_suite(yaml).unwrap();
        suite.groups[0].scenarios[0].clone()
    }

    async fn run(
        driver: &Arc<MockDriver>,
        scenario: &Scenario,
        ctx: &mut SharedContext,
    ) -> ScenarioState {
        let (emitter, _) = EventEmitter::new();
        let runner = ScenarioRunner {
            driver,
            emitter: &emitter,
            output_dir: Path::new("./output"),
            snapshot: false,
        };
        runner.run("test-group", scenario, ctx).await
    }

    #[tokio::test]
    async fn passing_scenario_grants_capability() {
        let driver = MockDriver::new()
            .with_page("/", MockPage::new(&["text=Sign In"], ""))
            .with_click_effect("/", "text=Sign In", ClickEffect::goto("/auth/login"))
            .with_page(
                "/auth/login",
                MockPage::new(
                    &["css=input[name=\"email\"]", "css=button[type=\"submit\"]"],
                    "",
                ),
            )
            .with_click_effect(
                "/auth/login",
                "css=button[type=\"submit\"]",
                ClickEffect::reveal("Logout My Account"),
            );

        let scenario = scenario_from_yaml(
            r#"
groups:
  - name: login
    scenarios:
      - name: valid-login
        establishes: login
        steps:
          - navigate: /
          - click: text=Sign In
          - fill:
              target: 'css=input[name="email"]'
              value: hassanjamal577987@gmail.com
              timeout: 500
          - click: 'css=button[type="submit"]'
        assert:
          timeout: 500
          any:
            - text: "/logout|sign out|my account/i"
"#,
        );

        let mut ctx = SharedContext::new(None, Some(500));
        let state = run(&driver, &scenario, &mut ctx).await;

        assert_eq!(state.status, ScenarioStatus::Passed);
        assert!(ctx.has("login"));
        assert_eq!(
            driver.actions(),
            vec![
                "goto /",
                "click text=Sign In",
                "fill css=input[name=\"email\"]=hassanjamal577987@gmail.com",
                "click css=button[type=\"submit\"]",
            ]
        );
    }

    #[tokio::test]
    async fn first_failed_required_step_halts_execution() {
        let driver = MockDriver::new().with_page("/", MockPage::new(&["text=Later"], ""));

        let scenario = scenario_from_yaml(
            r#"
groups:
  - name: g
    scenarios:
      - name: halting
        steps:
          - navigate: /
          - click:
              target: text=Missing
              timeout: 200
          - click: text=Later
        assert:
          timeout: 200
          any:
            - text: "/anything/"
"#,
        );

        let mut ctx = SharedContext::new(None, Some(200));
        let state = run(&driver, &scenario, &mut ctx).await;

        assert_eq!(state.status, ScenarioStatus::Failed);
        assert_eq!(state.failed_step, Some(1));
        // Nothing after the failed required step executes
        assert_eq!(driver.actions(), vec!["goto /"]);
        assert!(matches!(state.steps[2].status, StepStatus::Skipped { .. }));
        assert!(matches!(state.steps[3].status, StepStatus::Skipped { .. }));
        assert!(state.message.as_deref().unwrap_or("").contains("no locator"));
    }

    #[tokio::test]
    async fn optional_miss_continues_to_assertion() {
        let driver = MockDriver::new().with_page(
            "/",
            MockPage::new(&["css=input[name=\"email\"]"], "signup form"),
        );

        let scenario = scenario_from_yaml(
            r#"
groups:
  - name: g
    scenarios:
      - name: optional-fields
        steps:
          - fill:
              target: 'css=input[name="name"]'
              value: Test User
              required: false
              timeout: 200
          - fill:
              target: 'css=input[name="email"]'
              value: a@b.com
              timeout: 200
        assert:
          timeout: 200
          any:
            - text: "/signup form/"
"#,
        );

        let mut ctx = SharedContext::new(None, Some(200));
        let state = run(&driver, &scenario, &mut ctx).await;

        assert_eq!(state.status, ScenarioStatus::Passed);
        assert!(matches!(state.steps[0].status, StepStatus::Skipped { .. }));
        assert_eq!(driver.actions(), vec!["fill css=input[name=\"email\"]=a@b.com"]);
    }

    #[tokio::test]
    async fn unmet_precondition_fails_without_running_steps() {
        let driver = MockDriver::new();

        let scenario = scenario_from_yaml(
            r#"
groups:
  - name: payment
    scenarios:
      - name: checkout
        requires: login
        steps:
          - navigate: /checkout
        assert: "/thank you/i"
"#,
        );

        let mut ctx = SharedContext::new(None, Some(200));
        let state = run(&driver, &scenario, &mut ctx).await;

        assert_eq!(state.status, ScenarioStatus::Failed);
        assert_eq!(
            state.message.as_deref(),
            Some("precondition failed: login")
        );
        assert!(driver.actions().is_empty());
    }

    #[tokio::test]
    async fn absent_skip_probe_yields_skipped_verdict() {
        let driver = MockDriver::new().with_page("/", MockPage::new(&["text=Add to Cart"], ""));

        let scenario = scenario_from_yaml(
            r#"
groups:
  - name: cart
    scenarios:
      - name: out-of-stock
        skipUnless:
          target: "pattern=/out of stock|sold out/i"
          timeout: 200
          reason: no out-of-stock item on the page
        steps:
          - click: text=Add to Cart
        assert: "/out of stock/i"
"#,
        );

        let mut ctx = SharedContext::new(None, Some(200));
        let state = run(&driver, &scenario, &mut ctx).await;

        assert_eq!(state.status, ScenarioStatus::Skipped);
        assert_eq!(
            state.message.as_deref(),
            Some("no out-of-stock item on the page")
        );
        assert!(driver.actions().is_empty());
    }

    #[tokio::test]
    async fn driver_fault_is_terminal_and_flagged() {
        let driver = MockDriver::new()
            .with_page("/", MockPage::new(&["text=Pay"], ""))
            .with_fault_on("text=Pay");

        let scenario = scenario_from_yaml(
            r#"
groups:
  - name: g
    scenarios:
      - name: faulting
        steps:
          - click: text=Pay
        assert: "/never/"
"#,
        );

        let mut ctx = SharedContext::new(None, Some(200));
        let state = run(&driver, &scenario, &mut ctx).await;

        assert_eq!(state.status, ScenarioStatus::Failed);
        assert!(state.driver_fault);
        assert!(state
            .message
            .as_deref()
            .unwrap_or("")
            .starts_with("driver fault"));
    }

    #[tokio::test]
    async fn failure_records_observed_page_url() {
        let driver = MockDriver::new().with_page("/auth/login", MockPage::default());

        let scenario = scenario_from_yaml(
            r#"
groups:
  - name: g
    scenarios:
      - name: diagnosis
        steps:
          - navigate: /auth/login
        assert:
          timeout: 200
          any:
            - text: "/welcome/"
"#,
        );

        let mut ctx = SharedContext::new(None, Some(200));
        let state = run(&driver, &scenario, &mut ctx).await;

        assert_eq!(state.status, ScenarioStatus::Failed);
        assert_eq!(state.page_url.as_deref(), Some("/auth/login"));
    }
}
