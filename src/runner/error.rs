use thiserror::Error;

/// Failure taxonomy for scenario execution.
///
/// None of these propagate past the scenario boundary: the orchestrator
/// records a verdict and moves on to the next scenario.
#[derive(Debug, Error)]
pub enum RunError {
    /// No candidate of a selector strategy became visible in time.
    /// Recoverable: optional steps skip, required steps fail the scenario.
    #[error("no locator candidate matched within {timeout_ms}ms: {strategy}")]
    LocatorNotFound { strategy: String, timeout_ms: u64 },

    /// The defining pass/fail condition was not observed in time.
    /// Terminal for the scenario.
    #[error("condition not observed within {timeout_ms}ms: {condition}")]
    AssertionTimeout { condition: String, timeout_ms: u64 },

    /// A required shared-state dependency (e.g. prior login) was not
    /// established by an earlier scenario.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// The automation driver itself errored. Terminal for the scenario;
    /// the session is recycled before the next one.
    #[error(transparent)]
    DriverFault(#[from] anyhow::Error),
}

impl RunError {
    pub fn is_driver_fault(&self) -> bool {
        matches!(self, RunError::DriverFault(_))
    }
}
