//! Two-level reference code model.
//!
//! # Responsibility
//! - Define the category (`LargeCode`) and subcategory (`SmallCode`) records.
//! - Validate records before they reach the storage layer.
//!
//! # Invariants
//! - A `LargeCode` is identified by its caller-assigned `code`.
//! - A `SmallCode` is identified by `(large_code, small_code)`; the key never
//!   changes once persisted.
//! - A `LargeCode` exclusively owns the children attached to it.

pub mod large_code;
pub mod small_code;
pub mod use_flag;
pub mod validation;
