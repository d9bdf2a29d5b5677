use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ConsumptionError;

pub const CANCELLED_REASON: &str = "cancelled";

/// Terminal result of processing one work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum WorkOutcome {
    Success,
    Failure(String),
}

impl WorkOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        WorkOutcome::Failure(reason.into())
    }

    /// Outcome recorded for in-flight work abandoned by a hard stop
    pub fn cancelled() -> Self {
        WorkOutcome::Failure(CANCELLED_REASON.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkOutcome::Success)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkOutcome::Failure(reason) if reason == CANCELLED_REASON)
    }
}

impl From<Result<(), ConsumptionError>> for WorkOutcome {
    fn from(result: Result<(), ConsumptionError>) -> Self {
        match result {
            Ok(()) => WorkOutcome::Success,
            Err(e) => WorkOutcome::Failure(e.to_string()),
        }
    }
}

impl fmt::Display for WorkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkOutcome::Success => write!(f, "success"),
            WorkOutcome::Failure(reason) => write!(f, "failure: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        assert_eq!(WorkOutcome::from(Ok(())), WorkOutcome::Success);

        let outcome = WorkOutcome::from(Err(ConsumptionError::Failed("HTTP 404".to_string())));
        assert_eq!(outcome, WorkOutcome::Failure("HTTP 404".to_string()));
        assert!(!outcome.is_success());
        assert!(!outcome.is_cancelled());
    }

    #[test]
    fn test_cancelled_outcome() {
        let outcome = WorkOutcome::cancelled();
        assert!(outcome.is_cancelled());
        assert_eq!(outcome.to_string(), "failure: cancelled");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(WorkOutcome::failure("boom")).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["reason"], "boom");
    }
}
