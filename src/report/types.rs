use crate::runner::state::{RunSummary, ScenarioStateReport};
use serde::{Deserialize, Serialize};

/// Suite results for report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteResults {
    pub session_id: String,
    pub suite_name: String,
    pub scenarios: Vec<ScenarioStateReport>,
    pub summary: RunSummary,
    pub generated_at: String,
}
