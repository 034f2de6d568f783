//! Use-case service layer over the code repositories.
//!
//! # Responsibility
//! - Expose code-table use cases to callers (CLI, web handlers).
//! - Keep callers independent of concrete storage implementations.

pub mod code_service;
