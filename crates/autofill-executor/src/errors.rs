use thiserror::Error;

/// Executor error taxonomy.
///
/// Only `Navigation` is fatal to a run; everything else is scoped to one
/// candidate or one step and folds into that candidate's failure reason.
#[derive(Debug, Error, Clone)]
pub enum AutofillError {
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("element interaction failed: {0}")]
    Element(String),
    #[error("browser session error: {0}")]
    Session(String),
    #[error("step timed out after {0}ms")]
    StepTimeout(u64),
}

impl AutofillError {
    /// Fatal errors abort the run with empty outcome sets.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AutofillError::Navigation(_))
    }
}
