//! Per-app operation results and their aggregation.
//!
//! Callbacks return [`OperationResult`]. `AlreadyReported` means the failure
//! message was already shown to the user; it is tracked as a flag and never
//! placed inside the [`MultiError`].

use std::fmt;

use thiserror::Error;

/// Error returned by a per-app operation callback.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
    /// The failure was surfaced at its origin; do not print or wrap it again.
    #[error("failure already reported")]
    AlreadyReported,
}

pub type OperationResult = Result<(), OperationError>;

/// Tagged result of one per-app task.
#[derive(Debug)]
pub enum AppOutcome {
    Succeeded,
    Failed(anyhow::Error),
    AlreadyReported,
}

impl From<OperationResult> for AppOutcome {
    fn from(result: OperationResult) -> Self {
        match result {
            Ok(()) => AppOutcome::Succeeded,
            Err(OperationError::Failed(err)) => AppOutcome::Failed(err),
            Err(OperationError::AlreadyReported) => AppOutcome::AlreadyReported,
        }
    }
}

/// Aggregate of independent failures.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<anyhow::Error>,
}

impl MultiError {
    pub fn push(&mut self, err: anyhow::Error) {
        self.errors.push(err);
    }

    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<anyhow::Error> {
        self.errors
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.len() == 1 {
            writeln!(f, "1 error occurred:")?;
        } else {
            writeln!(f, "{} errors occurred:", self.errors.len())?;
        }
        for err in &self.errors {
            writeln!(f, "\t* {err:#}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

/// Running fold over per-app outcomes.
///
/// Merging two aggregates is order-preserving, so a parallel executor can
/// fold per-worker aggregates in task order and reach the same outcome.
#[derive(Debug, Default)]
pub struct Aggregate {
    failures: MultiError,
    already_reported: bool,
    completed: usize,
}

impl Aggregate {
    pub fn record(&mut self, outcome: AppOutcome) {
        self.completed += 1;
        match outcome {
            AppOutcome::Succeeded => {}
            AppOutcome::Failed(err) => self.failures.push(err),
            AppOutcome::AlreadyReported => self.already_reported = true,
        }
    }

    pub fn merge(mut self, other: Aggregate) -> Aggregate {
        self.completed += other.completed;
        self.already_reported |= other.already_reported;
        self.failures.errors.extend(other.failures.errors);
        self
    }

    /// Number of tasks whose outcome has been recorded.
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failures(&self) -> &MultiError {
        &self.failures
    }

    pub fn already_reported(&self) -> bool {
        self.already_reported
    }

    pub fn finish(self) -> DispatchOutcome {
        if !self.failures.is_empty() {
            DispatchOutcome::Failed(self.failures)
        } else if self.already_reported {
            DispatchOutcome::AlreadyReported
        } else {
            DispatchOutcome::Succeeded
        }
    }
}

/// Reduce per-app outcomes, in task order, to the final dispatch outcome.
pub fn reduce<I>(outcomes: I) -> DispatchOutcome
where
    I: IntoIterator<Item = AppOutcome>,
{
    outcomes
        .into_iter()
        .fold(Aggregate::default(), |mut aggregate, outcome| {
            aggregate.record(outcome);
            aggregate
        })
        .finish()
}

/// Aggregated result of applying an operation across a target list.
#[derive(Debug)]
pub enum DispatchOutcome {
    Succeeded,
    /// Substantive failures; already-reported failures are excluded.
    Failed(MultiError),
    /// Only already-reported failures occurred.
    AlreadyReported,
    /// Cancellation stopped the run; holds the results gathered so far.
    Canceled(Aggregate),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Failed(MultiError),
    #[error("failure already reported")]
    AlreadyReported,
    #[error("operation canceled")]
    Canceled,
}

impl DispatchError {
    /// True when nothing more should be printed for this error.
    pub fn is_already_reported(&self) -> bool {
        matches!(self, DispatchError::AlreadyReported)
    }
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Succeeded)
    }

    pub fn into_result(self) -> Result<(), DispatchError> {
        match self {
            DispatchOutcome::Succeeded => Ok(()),
            DispatchOutcome::Failed(errors) => Err(DispatchError::Failed(errors)),
            DispatchOutcome::AlreadyReported => Err(DispatchError::AlreadyReported),
            DispatchOutcome::Canceled(_) => Err(DispatchError::Canceled),
        }
    }
}
