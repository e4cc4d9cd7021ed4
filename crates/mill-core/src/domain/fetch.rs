//! Fetch groups: which associations a read materializes.
//!
//! A summary read leaves associations as `Fetched::NotLoaded`; touching them
//! is an explicit `FieldNotLoaded` error, never a hidden lazy load and never
//! an empty value. "No data" and "not fetched" stay distinguishable.

use super::errors::MillError;

/// The subset of a project's associations a read operation materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FetchGroup {
    /// Identity, name, state, dependencies and other scalar fields only.
    #[default]
    Summary,
    /// Summary plus the current checkout result.
    WithCheckoutResult,
    /// Summary plus the build-result history.
    WithBuilds,
    /// Everything.
    Detailed,
}

impl FetchGroup {
    pub fn includes_checkout_result(self) -> bool {
        matches!(self, FetchGroup::WithCheckoutResult | FetchGroup::Detailed)
    }

    pub fn includes_build_results(self) -> bool {
        matches!(self, FetchGroup::WithBuilds | FetchGroup::Detailed)
    }

    pub fn includes_notifiers(self) -> bool {
        matches!(self, FetchGroup::Detailed)
    }
}

/// An association that may or may not have been materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    Loaded(T),
    NotLoaded,
}

impl<T> Fetched<T> {
    pub fn get(&self, field: &'static str) -> Result<&T, MillError> {
        match self {
            Fetched::Loaded(value) => Ok(value),
            Fetched::NotLoaded => Err(MillError::FieldNotLoaded(field)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Fetched::Loaded(_))
    }

    /// Load only when `include` is set; the value is not computed otherwise.
    pub fn load_if(include: bool, load: impl FnOnce() -> T) -> Self {
        if include {
            Fetched::Loaded(load())
        } else {
            Fetched::NotLoaded
        }
    }
}
