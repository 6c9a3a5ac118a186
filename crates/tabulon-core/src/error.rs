//! Error types for the Tabulon document model.

use thiserror::Error;

use tabulon_engine::property::PropertyError;
use tabulon_engine::validate::ConstraintViolation;
use tabulon_engine::{DataType, ElementType, Property};

/// Errors that can occur operating on contexts, tables, and their elements.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("operations on deleted {0}s are not allowed")]
    DeletedElement(ElementType),

    #[error("invalid property: {elem}->'{key}'")]
    InvalidProperty { elem: ElementType, key: String },

    #[error("unimplemented: {elem}->{key}")]
    Unimplemented { elem: ElementType, key: Property },

    #[error("read-only: {elem}->{key}")]
    ReadOnlyProperty { elem: ElementType, key: Property },

    #[error("{elem} is write-protected")]
    WriteProtected { elem: ElementType },

    #[error("not child's parent: {parent}->{child}")]
    InvalidParent {
        parent: ElementType,
        child: ElementType,
    },

    #[error("invalid {kind} request: {access} {child}")]
    InvalidAccess {
        child: ElementType,
        access: &'static str,
        /// "insert" or "get".
        kind: &'static str,
    },

    #[error("invalid {elem}: {message}")]
    Invalid { elem: ElementType, message: String },

    #[error("unsupported on {elem}: {message}")]
    Unsupported { elem: ElementType, message: String },

    #[error("{0} label '{1}' not unique")]
    LabelNotUnique(ElementType, String),

    #[error("circular dependency detected")]
    CircularDependency,

    #[error("{elem} does not support null values")]
    NullNotSupported { elem: ElementType },

    #[error("datatype mismatch: column is {expected}, value is {actual}")]
    DataTypeMismatch { expected: DataType, actual: DataType },

    #[error("request blocked by event listener")]
    Blocked,

    #[error(transparent)]
    Constraint(#[from] ConstraintViolation),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV input is empty")]
    EmptyCsv,
}

impl From<PropertyError> for TableError {
    fn from(err: PropertyError) -> Self {
        match err {
            PropertyError::Unimplemented { elem, key } => TableError::Unimplemented { elem, key },
            PropertyError::ReadOnly { elem, key } => TableError::ReadOnlyProperty { elem, key },
            PropertyError::InvalidKey(key) => TableError::InvalidProperty {
                elem: ElementType::Table,
                key,
            },
        }
    }
}

impl TableError {
    pub(crate) fn invalid(elem: ElementType, message: impl Into<String>) -> Self {
        TableError::Invalid {
            elem,
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(elem: ElementType, message: impl Into<String>) -> Self {
        TableError::Unsupported {
            elem,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TableError>;
