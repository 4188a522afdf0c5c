//! Aggregate root traits for derived, reversible domain state.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;
}

/// Aggregate whose state is a fold over a set of applied events, where any
/// applied event can later be taken back out again.
///
/// - **Forward**: `apply(&mut self, event)` folds one event in.
/// - **Backward**: `reverse(&mut self, event)` removes exactly what `apply`
///   added for the same event values.
///
/// Both must be deterministic and free of IO. An `Err` leaves `self`
/// unchanged.
pub trait Reversible: AggregateRoot {
    type Event: Clone + core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event) -> DomainResult<()>;

    fn reverse(&mut self, event: &Self::Event) -> DomainResult<()>;
}

/// Optimistic concurrency expectation for a stored aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (first write, migrations, etc.).
    Any,
    /// The aggregate must not exist yet.
    NoAggregate,
    /// Require the stored aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// `actual` is `None` when nothing is stored yet.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::NoAggregate => actual.is_none(),
            ExpectedVersion::Exact(v) => actual == Some(v),
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}
