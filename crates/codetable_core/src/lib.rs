//! Two-level reference code tables ("large codes" and "small codes").
//!
//! Category/subcategory lookup tables persisted in SQLite, with cascade save
//! from a category to its children, eager graph reads and query-by-example
//! over subcategories.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig};
pub use logging::{init_logging_from_config, LoggingError};
pub use model::large_code::{LargeCode, LargeCodeBuilder};
pub use model::small_code::{SmallCode, SmallCodeBuilder, SmallCodeKey};
pub use model::use_flag::UseFlag;
pub use model::validation::CodeValidationError;
pub use repo::error::{RepoError, RepoResult};
pub use repo::example::{ExampleFilter, ExampleMatcher, MatchKind, SmallCodeExample, SmallCodeField};
pub use repo::large_code_repo::{LargeCodeRepository, SqliteLargeCodeRepository};
pub use repo::small_code_repo::{SmallCodeRepository, SqliteSmallCodeRepository};
pub use repo::CascadePolicy;
pub use service::code_service::CodeService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
