//! Shared error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Abstract failure classification shared by every subsystem.
///
/// Concrete error enums expose a `kind()` method returning one of these;
/// the worker decides retry/terminal behavior from the kind alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Storage 5xx, connection reset, timeout, retryable encoder exit
    Transient,
    /// Source unreadable, zero-duration probe, unknown container
    InputInvalid,
    /// Schema violation surfaced to the caller
    Contract,
    /// Actor lacks the required privilege
    Forbidden,
    /// Referenced record or object absent
    NotFound,
    /// Explicit abort
    Cancelled,
    /// Unexpected; retried once, then terminal
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::InputInvalid => "input_invalid",
            ErrorKind::Contract => "contract",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }

    /// Maximum retry attempts for this kind.
    pub fn retry_budget(&self) -> u32 {
        match self {
            ErrorKind::Transient => 3,
            ErrorKind::Internal => 1,
            _ => 0,
        }
    }

    /// True when a failed stage should mark the video record failed.
    pub fn is_fatal_for_record(&self) -> bool {
        matches!(self, ErrorKind::InputInvalid | ErrorKind::Contract)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_budgets() {
        assert_eq!(ErrorKind::Transient.retry_budget(), 3);
        assert_eq!(ErrorKind::Internal.retry_budget(), 1);
        assert_eq!(ErrorKind::InputInvalid.retry_budget(), 0);
        assert_eq!(ErrorKind::Contract.retry_budget(), 0);
    }

    #[test]
    fn fatal_kinds() {
        assert!(ErrorKind::InputInvalid.is_fatal_for_record());
        assert!(!ErrorKind::Transient.is_fatal_for_record());
        assert!(!ErrorKind::Cancelled.is_fatal_for_record());
    }
}
