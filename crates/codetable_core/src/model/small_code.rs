//! Subcategory record keyed by `(large_code, small_code)`.

use super::use_flag::UseFlag;
use super::validation::{require_key, CodeValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Composite primary key of a `SmallCode`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SmallCodeKey {
    pub large_code: String,
    pub small_code: String,
}

impl SmallCodeKey {
    pub fn new(large_code: impl Into<String>, small_code: impl Into<String>) -> Self {
        Self {
            large_code: large_code.into(),
            small_code: small_code.into(),
        }
    }
}

impl Display for SmallCodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.large_code, self.small_code)
    }
}

/// Subcategory entry listed under one `LargeCode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmallCode {
    /// Parent `LargeCode::code`. First key component.
    pub large_code: String,
    /// Unique within the parent. Second key component.
    pub small_code: String,
    /// Display label.
    pub name: String,
    pub sort_sequence: i64,
    pub use_flag: UseFlag,
    /// Free text, nullable in storage.
    pub memo: Option<String>,
}

impl SmallCode {
    /// Starts a builder for the given key.
    pub fn builder(large_code: impl Into<String>, small_code: impl Into<String>) -> SmallCodeBuilder {
        SmallCodeBuilder {
            large_code: large_code.into(),
            small_code: small_code.into(),
            name: None,
            sort_sequence: None,
            use_flag: UseFlag::default(),
            memo: None,
        }
    }

    pub fn key(&self) -> SmallCodeKey {
        SmallCodeKey::new(self.large_code.as_str(), self.small_code.as_str())
    }

    /// Checks key invariants. Called by every repository write path.
    pub fn validate(&self) -> Result<(), CodeValidationError> {
        require_key(&self.large_code, "large_code")?;
        require_key(&self.small_code, "small_code")?;
        Ok(())
    }
}

/// Builder for `SmallCode`.
///
/// `name` and `sort_sequence` are required; `use_flag` defaults to
/// `UseFlag::Yes` and `memo` to `None`.
#[derive(Debug, Clone)]
pub struct SmallCodeBuilder {
    large_code: String,
    small_code: String,
    name: Option<String>,
    sort_sequence: Option<i64>,
    use_flag: UseFlag,
    memo: Option<String>,
}

impl SmallCodeBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn sort_sequence(mut self, sort_sequence: i64) -> Self {
        self.sort_sequence = Some(sort_sequence);
        self
    }

    pub fn use_flag(mut self, use_flag: UseFlag) -> Self {
        self.use_flag = use_flag;
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn build(self) -> Result<SmallCode, CodeValidationError> {
        let name = self.name.ok_or(CodeValidationError::MissingField {
            entity: "small code",
            field: "name",
        })?;
        let sort_sequence = self.sort_sequence.ok_or(CodeValidationError::MissingField {
            entity: "small code",
            field: "sort_sequence",
        })?;

        let code = SmallCode {
            large_code: self.large_code,
            small_code: self.small_code,
            name,
            sort_sequence,
            use_flag: self.use_flag,
            memo: self.memo,
        };
        code.validate()?;
        Ok(code)
    }
}
