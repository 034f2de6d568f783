//! Category record and its owned subcategories.

use super::small_code::SmallCode;
use super::use_flag::UseFlag;
use super::validation::{require_key, CodeValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Top-level category ("large code").
///
/// `children` is owned by this record: saving or deleting the category
/// propagates to them when the repository cascade policy allows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargeCode {
    /// Caller-assigned primary key, e.g. `WWW01`.
    pub code: String,
    pub name: String,
    /// Classification tag, e.g. `SYS`.
    pub category_division: String,
    pub sort_sequence: i64,
    pub use_flag: UseFlag,
    /// Epoch milliseconds. `None` until the first save.
    pub registered_at: Option<i64>,
    /// Ordered by `sort_sequence`, then `small_code`, when loaded from storage.
    pub children: Vec<SmallCode>,
}

impl LargeCode {
    /// Starts a builder for the given code.
    pub fn builder(code: impl Into<String>) -> LargeCodeBuilder {
        LargeCodeBuilder {
            code: code.into(),
            name: None,
            category_division: None,
            sort_sequence: None,
            use_flag: UseFlag::default(),
            children: Vec::new(),
        }
    }

    /// Attaches `child`, re-keying it under this code.
    pub fn push_child(&mut self, mut child: SmallCode) {
        child.large_code.clone_from(&self.code);
        self.children.push(child);
    }

    /// Checks the record and every attached child.
    ///
    /// # Invariants
    /// - Every child's `large_code` equals `code`.
    /// - No two children share a `small_code`.
    pub fn validate(&self) -> Result<(), CodeValidationError> {
        require_key(&self.code, "code")?;

        let mut seen = HashSet::new();
        for child in &self.children {
            child.validate()?;
            if child.large_code != self.code {
                return Err(CodeValidationError::ChildParentMismatch {
                    parent: self.code.clone(),
                    child_large_code: child.large_code.clone(),
                    small_code: child.small_code.clone(),
                });
            }
            if !seen.insert(child.small_code.as_str()) {
                return Err(CodeValidationError::DuplicateChild {
                    large_code: self.code.clone(),
                    small_code: child.small_code.clone(),
                });
            }
        }
        Ok(())
    }

    /// Looks up an attached child by its `small_code`.
    pub fn child(&self, small_code: &str) -> Option<&SmallCode> {
        self.children
            .iter()
            .find(|child| child.small_code == small_code)
    }
}

/// Builder for `LargeCode`.
///
/// `name`, `category_division` and `sort_sequence` are required.
#[derive(Debug, Clone)]
pub struct LargeCodeBuilder {
    code: String,
    name: Option<String>,
    category_division: Option<String>,
    sort_sequence: Option<i64>,
    use_flag: UseFlag,
    children: Vec<SmallCode>,
}

impl LargeCodeBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn category_division(mut self, category_division: impl Into<String>) -> Self {
        self.category_division = Some(category_division.into());
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

    /// Attaches children as-is; `build()` rejects any child keyed under
    /// another parent.
    pub fn children(mut self, children: impl IntoIterator<Item = SmallCode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn build(self) -> Result<LargeCode, CodeValidationError> {
        let name = self.name.ok_or(CodeValidationError::MissingField {
            entity: "large code",
            field: "name",
        })?;
        let category_division = self
            .category_division
            .ok_or(CodeValidationError::MissingField {
                entity: "large code",
                field: "category_division",
            })?;
        let sort_sequence = self.sort_sequence.ok_or(CodeValidationError::MissingField {
            entity: "large code",
            field: "sort_sequence",
        })?;

        let code = LargeCode {
            code: self.code,
            name,
            category_division,
            sort_sequence,
            use_flag: self.use_flag,
            registered_at: None,
            children: self.children,
        };
        code.validate()?;
        Ok(code)
    }
}
