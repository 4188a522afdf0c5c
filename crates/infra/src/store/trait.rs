use std::sync::Arc;

use thiserror::Error;

use crease_core::{BallId, ExpectedVersion, MatchId};
use crease_scoring::{BallEvent, MatchAggregate};

/// A persisted match together with its write version.
///
/// `version` starts at 1 on the first save and grows by one on every save.
/// It is storage metadata and not part of the aggregate itself.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMatch {
    pub aggregate: MatchAggregate,
    pub version: u64,
}

/// Storage operation error.
///
/// These are **infrastructure errors** as opposed to domain errors
/// (validation, missing entities, inconsistent folds).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

/// Match aggregate storage.
///
/// `save` must reject a write whose `expected` version does not match what
/// is stored, so concurrent read-modify-write cycles on one match cannot
/// silently lose an update.
pub trait MatchStore: Send + Sync {
    fn get(&self, id: MatchId) -> Result<Option<StoredMatch>, StoreError>;

    /// Insert or replace; returns the new version.
    fn save(&self, aggregate: MatchAggregate, expected: ExpectedVersion) -> Result<u64, StoreError>;

    /// Returns `false` when nothing was stored under `id`.
    fn delete(&self, id: MatchId) -> Result<bool, StoreError>;

    fn list(&self) -> Result<Vec<StoredMatch>, StoreError>;
}

/// Ball storage.
pub trait BallStore: Send + Sync {
    fn get(&self, id: BallId) -> Result<Option<BallEvent>, StoreError>;

    /// Insert or replace by ball id.
    fn save(&self, ball: BallEvent) -> Result<(), StoreError>;

    fn delete(&self, id: BallId) -> Result<bool, StoreError>;

    /// All balls of a match in recording order.
    fn list_for_match(&self, match_id: MatchId) -> Result<Vec<BallEvent>, StoreError>;

    /// Returns how many balls were removed.
    fn delete_for_match(&self, match_id: MatchId) -> Result<usize, StoreError>;
}

impl<S> MatchStore for Arc<S>
where
    S: MatchStore + ?Sized,
{
    fn get(&self, id: MatchId) -> Result<Option<StoredMatch>, StoreError> {
        (**self).get(id)
    }

    fn save(&self, aggregate: MatchAggregate, expected: ExpectedVersion) -> Result<u64, StoreError> {
        (**self).save(aggregate, expected)
    }

    fn delete(&self, id: MatchId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }

    fn list(&self) -> Result<Vec<StoredMatch>, StoreError> {
        (**self).list()
    }
}

impl<S> BallStore for Arc<S>
where
    S: BallStore + ?Sized,
{
    fn get(&self, id: BallId) -> Result<Option<BallEvent>, StoreError> {
        (**self).get(id)
    }

    fn save(&self, ball: BallEvent) -> Result<(), StoreError> {
        (**self).save(ball)
    }

    fn delete(&self, id: BallId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }

    fn list_for_match(&self, match_id: MatchId) -> Result<Vec<BallEvent>, StoreError> {
        (**self).list_for_match(match_id)
    }

    fn delete_for_match(&self, match_id: MatchId) -> Result<usize, StoreError> {
        (**self).delete_for_match(match_id)
    }
}
