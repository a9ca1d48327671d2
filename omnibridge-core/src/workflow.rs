//! Failure reporting shared by the registration and transfer workflows.

use std::fmt;

use crate::error::BridgeError;
use crate::types::SubmissionResult;

/// A workflow that stopped before its terminal state.
///
/// `stage` is the last state the workflow reached. `submission` is set once an
/// irrevocable call went out, telling the caller not to start over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowFailure<S> {
    pub stage: S,
    pub error: BridgeError,
    pub submission: Option<SubmissionResult>,
}

impl<S> WorkflowFailure<S> {
    pub fn new(stage: S, error: BridgeError) -> Self {
        Self {
            stage,
            error,
            submission: None,
        }
    }

    pub fn after_submission(stage: S, error: BridgeError, submission: SubmissionResult) -> Self {
        Self {
            stage,
            error,
            submission: Some(submission),
        }
    }

    /// True when something was already submitted on chain.
    pub fn submitted(&self) -> bool {
        self.submission.is_some()
    }

    pub fn into_error(self) -> BridgeError {
        self.error
    }
}

impl<S: fmt::Debug> fmt::Display for WorkflowFailure<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "workflow failed at {:?}: {}", self.stage, self.error)
    }
}

impl<S: fmt::Debug> std::error::Error for WorkflowFailure<S> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<S> From<WorkflowFailure<S>> for BridgeError {
    fn from(failure: WorkflowFailure<S>) -> Self {
        failure.error
    }
}
