use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use super::context::SharedContext;
use super::events::{EventEmitter, RunEvent};
use super::scenario::{build_step_states, ScenarioRunner};
use super::state::{ScenarioState, SessionState};
use crate::driver::traits::{BrowserDriver, SessionFactory};
use crate::parser::types::{Group, Suite};

/// Runs a suite's groups strictly in declared order. Scenarios within a
/// group (and along the serial chain of groups) share one browser session
/// and one context; a failed scenario never aborts the suite. Groups marked
/// `isolated` run on their own sessions, in parallel when enabled.
pub struct SuiteOrchestrator {
    factory: Arc<dyn SessionFactory>,
    emitter: EventEmitter,
    output_dir: PathBuf,
    snapshot: bool,
    parallel: bool,
}

impl SuiteOrchestrator {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        emitter: EventEmitter,
        output_dir: PathBuf,
        snapshot: bool,
        parallel: bool,
    ) -> Self {
        Self {
            factory,
            emitter,
            output_dir,
            snapshot,
            parallel,
        }
    }

    pub async fn run(&self, suite: &Suite) -> Result<SessionState> {
        let mut session = SessionState::new(&Uuid::new_v4().to_string());
        session.start();
        self.emitter.emit(RunEvent::SessionStarted {
            session_id: session.session_id.clone(),
        });

        let mut results: Vec<Option<Vec<ScenarioState>>> = vec![None; suite.groups.len()];

        // Isolated groups get their own session and context; with parallel
        // execution enabled they run concurrently with the serial chain
        let mut handles = Vec::new();
        if self.parallel {
            for (group_index, group) in suite.groups.iter().enumerate() {
                if !group.isolated {
                    continue;
                }
                let factory = self.factory.clone();
                let emitter = self.emitter.clone();
                let task_group = group.clone();
                let suite_base_url = suite.base_url.clone();
                let default_timeout = suite.default_timeout_ms;
                let output_dir = self.output_dir.clone();
                let snapshot = self.snapshot;

                let handle = tokio::spawn(async move {
                    run_group_session(
                        factory,
                        emitter,
                        &task_group,
                        suite_base_url,
                        default_timeout,
                        output_dir,
                        snapshot,
                    )
                    .await
                });
                handles.push((group_index, group.clone(), handle));
            }
        }

        // Serial chain: one session, one shared context across groups
        let serial_groups: Vec<(usize, &Group)> = suite
            .groups
            .iter()
            .enumerate()
            .filter(|(_, g)| !(self.parallel && g.isolated))
            .collect();

        if !serial_groups.is_empty() {
            let mut driver = self.factory.create().await?;
            let mut ctx = SharedContext::new(suite.base_url.clone(), suite.default_timeout_ms);

            for (group_index, group) in serial_groups {
                self.emitter.emit(RunEvent::GroupStarted {
                    group_name: group.name.clone(),
                    scenario_count: group.scenarios.len(),
                });

                let mut states = Vec::new();
                for scenario in &group.scenarios {
                    let runner = ScenarioRunner {
                        driver: &*driver,
                        emitter: &self.emitter,
                        output_dir: &self.output_dir,
                        snapshot: self.snapshot,
                    };
                    let state = runner.run(&group.name, scenario, &mut ctx).await;
                    let fault = state.driver_fault;
                    states.push(state);

                    if fault && !super::is_cancelled() {
                        log::warn!(
                            "driver fault in '{}', recycling browser session",
                            scenario.name
                        );
                        let _ = driver.close().await;
                        driver = self.factory.create().await?;
                    }
                }

                self.emitter.emit(RunEvent::GroupFinished {
                    group_name: group.name.clone(),
                });
                results[group_index] = Some(states);
            }

            let _ = driver.close().await;
        }

        for (group_index, group, handle) in handles {
            let states = match handle.await {
                Ok(states) => states,
                Err(e) => failed_group_states(&group, &format!("driver fault: {}", e)),
            };
            results[group_index] = Some(states);
        }

        // Assemble verdicts in declared order
        for states in results.into_iter().flatten() {
            for state in states {
                session.add_scenario(state);
            }
        }

        session.finish();
        self.emitter.emit(RunEvent::SessionFinished {
            summary: session.summary(),
        });

        Ok(session)
    }
}

/// Run one isolated group on its own browser session and fresh context.
/// The session is released on every exit path.
async fn run_group_session(
    factory: Arc<dyn SessionFactory>,
    emitter: EventEmitter,
    group: &Group,
    base_url: Option<String>,
    default_timeout_ms: Option<u64>,
    output_dir: PathBuf,
    snapshot: bool,
) -> Vec<ScenarioState> {
    emitter.emit(RunEvent::GroupStarted {
        group_name: group.name.clone(),
        scenario_count: group.scenarios.len(),
    });

    let mut driver: Box<dyn BrowserDriver> = match factory.create().await {
        Ok(d) => d,
        Err(e) => {
            let states = failed_group_states(group, &format!("driver fault: {}", e));
            emitter.emit(RunEvent::GroupFinished {
                group_name: group.name.clone(),
            });
            return states;
        }
    };

    let mut ctx = SharedContext::new(base_url, default_timeout_ms);
    let mut states = Vec::new();

    for scenario in &group.scenarios {
        let runner = ScenarioRunner {
            driver: &*driver,
            emitter: &emitter,
            output_dir: &output_dir,
            snapshot,
        };
        let state = runner.run(&group.name, scenario, &mut ctx).await;
        let fault = state.driver_fault;
        states.push(state);

        if fault && !super::is_cancelled() {
            log::warn!(
                "driver fault in '{}', recycling browser session",
                scenario.name
            );
            let _ = driver.close().await;
            match factory.create().await {
                Ok(d) => driver = d,
                Err(e) => {
                    for scenario in group.scenarios.iter().skip(states.len()) {
                        let mut state = ScenarioState::new(
                            &scenario.name,
                            &group.name,
                            build_step_states(scenario),
                        );
                        state.fail(format!("driver fault: {}", e), None);
                        states.push(state);
                    }
                    break;
                }
            }
        }
    }

    let _ = driver.close().await;
    emitter.emit(RunEvent::GroupFinished {
        group_name: group.name.clone(),
    });
    states
}

fn failed_group_states(group: &Group, message: &str) -> Vec<ScenarioState> {
    group
        .scenarios
        .iter()
        .map(|scenario| {
            let mut state =
                ScenarioState::new(&scenario.name, &group.name, build_step_states(scenario));
            state.fail(message.to_string(), None);
            state
        })
        .collect()
}
