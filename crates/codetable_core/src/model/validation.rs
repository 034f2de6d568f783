//! Validation failures raised before any code record is written.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// A code record that must not be persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeValidationError {
    /// A key component is empty.
    EmptyKey { field: &'static str },
    /// The builder was finished without a required field.
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
    /// A child attached to a large code points at another parent.
    ChildParentMismatch {
        parent: String,
        child_large_code: String,
        small_code: String,
    },
    /// The same child key appears twice in one children collection.
    DuplicateChild {
        large_code: String,
        small_code: String,
    },
}

impl Display for CodeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyKey { field } => write!(f, "key field `{field}` must not be empty"),
            Self::MissingField { entity, field } => {
                write!(f, "{entity} requires field `{field}`")
            }
            Self::ChildParentMismatch {
                parent,
                child_large_code,
                small_code,
            } => write!(
                f,
                "small code `{child_large_code}/{small_code}` cannot be attached to large code `{parent}`"
            ),
            Self::DuplicateChild {
                large_code,
                small_code,
            } => write!(
                f,
                "small code `{large_code}/{small_code}` is attached more than once"
            ),
        }
    }
}

impl Error for CodeValidationError {}

pub(crate) fn require_key(value: &str, field: &'static str) -> Result<(), CodeValidationError> {
    if value.trim().is_empty() {
        return Err(CodeValidationError::EmptyKey { field });
    }
    Ok(())
}
