use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Step execution status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Passed,
    Failed { error: String },
    Skipped { reason: String },
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Passed | StepStatus::Failed { .. } | StepStatus::Skipped { .. }
        )
    }
}

/// State for a single step execution
#[derive(Debug, Clone)]
pub struct StepState {
    pub index: usize,
    pub label: String,
    pub status: StepStatus,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub duration_ms: Option<u64>,
    pub screenshot_path: Option<String>,
}

impl StepState {
    pub fn new(index: usize, label: &str) -> Self {
        Self {
            index,
            label: label.to_string(),
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            screenshot_path: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn pass(&mut self) {
        self.finish(StepStatus::Passed);
    }

    pub fn fail(&mut self, error: String) {
        self.finish(StepStatus::Failed { error });
    }

    pub fn skip(&mut self, reason: String) {
        self.status = StepStatus::Skipped { reason };
    }

    fn finish(&mut self, status: StepStatus) {
        self.status = status;
        self.finished_at = Some(Instant::now());
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }

    pub fn to_report(&self) -> StepStateReport {
        StepStateReport {
            index: self.index,
            label: self.label.clone(),
            status: self.status.clone(),
            duration_ms: self.duration_ms,
            screenshot_path: self.screenshot_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStateReport {
    pub index: usize,
    pub label: String,
    pub status: StepStatus,
    pub duration_ms: Option<u64>,
    pub screenshot_path: Option<String>,
}

/// Scenario verdict: Pending → Running → {Passed, Failed, Skipped}, terminal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScenarioStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

/// State for one scenario execution. Produced exactly once per scenario;
/// terminal fields never change after the verdict is set.
#[derive(Debug, Clone)]
pub struct ScenarioState {
    pub scenario_name: String,
    pub group_name: String,
    pub status: ScenarioStatus,
    pub steps: Vec<StepState>,
    /// Diagnostic for failures, reason for skips
    pub message: Option<String>,
    pub failed_step: Option<usize>,
    /// Document URL observed when the verdict was decided
    pub page_url: Option<String>,
    pub driver_fault: bool,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub duration_ms: Option<u64>,
}

impl ScenarioState {
    pub fn new(scenario_name: &str, group_name: &str, steps: Vec<StepState>) -> Self {
        Self {
            scenario_name: scenario_name.to_string(),
            group_name: group_name.to_string(),
            status: ScenarioStatus::Pending,
            steps,
            message: None,
            failed_step: None,
            page_url: None,
            driver_fault: false,
            started_at: None,
            finished_at: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = ScenarioStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn pass(&mut self) {
        self.finish(ScenarioStatus::Passed);
    }

    pub fn fail(&mut self, message: String, failed_step: Option<usize>) {
        self.message = Some(message);
        self.failed_step = failed_step;
        self.finish(ScenarioStatus::Failed);
    }

    pub fn skip(&mut self, reason: String) {
        self.message = Some(reason);
        self.finish(ScenarioStatus::Skipped);
    }

    pub fn skip_remaining_steps(&mut self, from: usize, reason: &str) {
        for step in &mut self.steps[from..] {
            if matches!(step.status, StepStatus::Pending | StepStatus::Running) {
                step.skip(reason.to_string());
            }
        }
    }

    fn finish(&mut self, status: ScenarioStatus) {
        self.status = status;
        self.finished_at = Some(Instant::now());
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }

    pub fn to_report(&self) -> ScenarioStateReport {
        ScenarioStateReport {
            scenario_name: self.scenario_name.clone(),
            group_name: self.group_name.clone(),
            status: self.status.clone(),
            steps: self.steps.iter().map(|s| s.to_report()).collect(),
            message: self.message.clone(),
            failed_step: self.failed_step,
            page_url: self.page_url.clone(),
            driver_fault: self.driver_fault,
            duration_ms: self.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStateReport {
    pub scenario_name: String,
    pub group_name: String,
    pub status: ScenarioStatus,
    pub steps: Vec<StepStateReport>,
    pub message: Option<String>,
    pub failed_step: Option<usize>,
    pub page_url: Option<String>,
    pub driver_fault: bool,
    pub duration_ms: Option<u64>,
}

/// Aggregate state for one suite run
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub scenarios: Vec<ScenarioState>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl SessionState {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            scenarios: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn add_scenario(&mut self, scenario: ScenarioState) {
        self.scenarios.push(scenario);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    pub fn summary(&self) -> RunSummary {
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for scenario in &self.scenarios {
            match scenario.status {
                ScenarioStatus::Passed => passed += 1,
                ScenarioStatus::Failed => failed += 1,
                ScenarioStatus::Skipped => skipped += 1,
                _ => {}
            }
        }

        let mut groups: Vec<&str> = Vec::new();
        for scenario in &self.scenarios {
            if !groups.contains(&scenario.group_name.as_str()) {
                groups.push(&scenario.group_name);
            }
        }

        let total_duration_ms = self.started_at.map(|start| {
            self.finished_at
                .unwrap_or_else(Instant::now)
                .duration_since(start)
                .as_millis() as u64
        });

        RunSummary {
            session_id: self.session_id.clone(),
            total_groups: groups.len() as u32,
            total_scenarios: self.scenarios.len() as u32,
            passed,
            failed,
            skipped,
            total_duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub session_id: String,
    pub total_groups: u32,
    pub total_scenarios: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total_duration_ms: Option<u64>,
}
