//! Computation primitives: error codes, error results, derivation handles.
//!
//! Derivations here are opaque registrations: the model tracks which
//! elements are derived and what they read, and recalculation traverses
//! that bookkeeping. There is deliberately no expression language.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Calculation failure classifications postable into cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    DivideByZero,
    NaN,
    Infinity,
    InvalidOperand,
    InvalidPendingOperator,
    InvalidTableOperand,
    ReferenceRequired,
    SeeErrorMessage,
    StackOverflow,
    StackUnderflow,
    OperandDataTypeMismatch,
    OperandRequired,
    UnimplementedStatistic,
    UnimplementedTransformation,
    Unspecified,
    NoError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A calculation error: a code plus an optional message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    code: ErrorCode,
    message: Option<String>,
}

impl fmt::Display for ErrorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", self.code, msg),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for ErrorResult {}

impl ErrorResult {
    pub fn new(code: ErrorCode, message: Option<impl Into<String>>) -> Self {
        ErrorResult {
            code,
            message: message.map(Into::into),
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        ErrorResult {
            code,
            message: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

static DERIVATION_IDENTS: AtomicU64 = AtomicU64::new(1000);

/// A registered calculation attached to a derivable element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Derivation {
    ident: u64,
    label: Option<String>,
}

impl Derivation {
    pub fn new() -> Self {
        Derivation {
            ident: DERIVATION_IDENTS.fetch_add(1, Ordering::Relaxed),
            label: None,
        }
    }

    pub fn labeled(label: impl Into<String>) -> Self {
        let mut d = Derivation::new();
        d.label = Some(label.into());
        d
    }

    pub fn ident(&self) -> u64 {
        self.ident
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl Default for Derivation {
    fn default() -> Self {
        Derivation::new()
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "Derivation#{}: {}", self.ident, label),
            None => write!(f, "Derivation#{}", self.ident),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_result_display() {
        let e = ErrorResult::from_code(ErrorCode::DivideByZero);
        assert_eq!(e.to_string(), "DivideByZero");

        let e = ErrorResult::new(ErrorCode::SeeErrorMessage, Some("bad operand"));
        assert_eq!(e.to_string(), "SeeErrorMessage: bad operand");
        assert_eq!(e.code(), ErrorCode::SeeErrorMessage);
        assert_eq!(e.message(), Some("bad operand"));
    }

    #[test]
    fn test_derivation_idents_are_unique() {
        let a = Derivation::new();
        let b = Derivation::labeled("col sum");
        assert_ne!(a.ident(), b.ident());
        assert_eq!(b.label(), Some("col sum"));
    }
}
