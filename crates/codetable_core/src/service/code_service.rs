//! Code-table use-case service.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::large_code::LargeCode;
use crate::model::small_code::{SmallCode, SmallCodeKey};
use crate::model::use_flag::UseFlag;
use crate::repo::error::RepoResult;
use crate::repo::example::{ExampleMatcher, SmallCodeExample};
use crate::repo::large_code_repo::LargeCodeRepository;
use crate::repo::small_code_repo::SmallCodeRepository;

/// Use-case wrapper composing both code stores.
pub struct CodeService<L: LargeCodeRepository, S: SmallCodeRepository> {
    large_codes: L,
    small_codes: S,
}

impl<L: LargeCodeRepository, S: SmallCodeRepository> CodeService<L, S> {
    pub fn new(large_codes: L, small_codes: S) -> Self {
        Self {
            large_codes,
            small_codes,
        }
    }

    /// Registers a category together with its attached children.
    ///
    /// Returns the stored graph, as read back inside the same transaction.
    pub fn register(&self, code: &LargeCode) -> RepoResult<LargeCode> {
        self.large_codes.save(code)
    }

    pub fn register_all(&self, codes: &[LargeCode]) -> RepoResult<Vec<LargeCode>> {
        self.large_codes.save_all(codes)
    }

    /// Loads one category with its children in a single read.
    pub fn category(&self, code: &str) -> RepoResult<Option<LargeCode>> {
        self.large_codes.find_with_children_by_code(code)
    }

    /// Loads every category with its children in a single read.
    pub fn categories(&self) -> RepoResult<Vec<LargeCode>> {
        self.large_codes.find_all_with_children()
    }

    pub fn remove_category(&self, code: &str) -> RepoResult<()> {
        self.large_codes.delete_by_id(code)
    }

    pub fn save_small_code(&self, code: &SmallCode) -> RepoResult<SmallCode> {
        self.small_codes.save(code)
    }

    pub fn small_code(&self, key: &SmallCodeKey) -> RepoResult<Option<SmallCode>> {
        self.small_codes.find_by_id(key)
    }

    pub fn remove_small_code(&self, key: &SmallCodeKey) -> RepoResult<()> {
        self.small_codes.delete_by_id(key)
    }

    /// Lists the children of `large_code` that are flagged `Y`, in store
    /// order. This is the list offered to end users.
    pub fn active_small_codes(&self, large_code: &str) -> RepoResult<Vec<SmallCode>> {
        let example = SmallCodeExample::default()
            .large_code(large_code)
            .use_flag(UseFlag::Yes);
        self.small_codes
            .find_by_example(&example, &ExampleMatcher::matching())
    }

    pub fn search_small_codes(
        &self,
        example: &SmallCodeExample,
        matcher: &ExampleMatcher,
    ) -> RepoResult<Vec<SmallCode>> {
        self.small_codes.find_by_example(example, matcher)
    }
}
