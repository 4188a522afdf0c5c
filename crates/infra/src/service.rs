//! Scoring pipeline (application-level orchestration).
//!
//! `ScoringService` is the caller the engine expects: it loads the match and
//! ball from storage, runs the pure engine, and persists the results.
//!
//! ```text
//! add:    lock match → load match (or start one) → record ball → apply → save ball → save match
//! edit:   find match → lock match → load ball → load match → reverse old + apply new → save ball → save match
//! delete: find match → lock match → load ball → load match → reverse → delete ball → save match
//! ```
//!
//! Every read-modify-write holds that match's lock from the first load to
//! the last save, so the ball values being reversed are always the ones the
//! stored match reflects. The match save is the commit point: if it fails,
//! the ball write before it is undone.
//!
//! Locks are per service. Match saves also carry the version that was
//! loaded, so a second service writing the same stores gets
//! `ServiceError::Concurrency` on the match instead of overwriting it.
//! This module contains no IO itself; it composes the storage traits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crease_core::{BallId, DomainError, ExpectedVersion, MatchId};
use crease_scoring::{BallDetails, BallEvent, MatchAggregate, engine};

use crate::config::ScoringConfig;
use crate::ledger::{AppliedLedger, LedgerError};
use crate::store::{BallStore, MatchStore, StoreError, StoredMatch};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller input rejected (blank names, malformed ids).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Match or ball does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The stored match does not reflect the balls it should. Not retryable.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// Another writer updated the match first; reload and retry.
    #[error("conflict: {0}")]
    Concurrency(String),

    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::NotFound(what) => ServiceError::NotFound(what),
            DomainError::InconsistentState(msg) => ServiceError::InconsistentState(msg),
            DomainError::Conflict(msg) => ServiceError::Concurrency(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => ServiceError::Concurrency(msg),
            other => ServiceError::Store(other),
        }
    }
}

impl From<LedgerError> for ServiceError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Poisoned => ServiceError::Store(StoreError::Poisoned("applied-ball ledger")),
            other => ServiceError::InconsistentState(other.to_string()),
        }
    }
}

/// A match together with its ball-by-ball record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetails {
    #[serde(rename = "match")]
    pub aggregate: MatchAggregate,
    pub ball_by_ball_data: Vec<BallEvent>,
}

/// One mutex per match. Entries are never removed, so two writers can never
/// end up holding different locks for the same match.
#[derive(Debug, Default)]
struct MatchLocks {
    locks: Mutex<HashMap<MatchId, Arc<Mutex<()>>>>,
}

impl MatchLocks {
    fn for_match(&self, match_id: MatchId) -> Result<Arc<Mutex<()>>, StoreError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| StoreError::Poisoned("match lock table"))?;
        Ok(locks.entry(match_id).or_default().clone())
    }
}

#[derive(Debug)]
pub struct ScoringService<M, B> {
    matches: M,
    balls: B,
    ledger: Option<AppliedLedger>,
    locks: MatchLocks,
}

impl<M, B> ScoringService<M, B>
where
    M: MatchStore,
    B: BallStore,
{
    pub fn new(matches: M, balls: B, config: &ScoringConfig) -> Self {
        Self {
            matches,
            balls,
            ledger: config.verify_ledger.then(AppliedLedger::new),
            locks: MatchLocks::default(),
        }
    }

    pub fn into_parts(self) -> (M, B) {
        (self.matches, self.balls)
    }

    /// Record a ball. A match that does not exist yet is started lazily:
    /// under `match_id` when one is given, otherwise under a fresh id.
    pub fn add_ball(
        &self,
        match_id: Option<MatchId>,
        details: BallDetails,
    ) -> Result<(BallEvent, MatchAggregate), ServiceError> {
        let match_id = match_id.unwrap_or_else(MatchId::new);
        self.run("add_ball", || {
            self.with_match_locked(match_id, || {
                let now = Utc::now();
                let (mut aggregate, expected) = match self.matches.get(match_id)? {
                    Some(StoredMatch { aggregate, version }) => {
                        self.sync_ledger(&aggregate)?;
                        (aggregate, ExpectedVersion::Exact(version))
                    }
                    None => {
                        tracing::info!(match_id = %match_id, "starting match");
                        (MatchAggregate::empty(match_id, now), ExpectedVersion::NoAggregate)
                    }
                };

                let ball = BallEvent::record(match_id, details, now)?;
                engine::apply(&mut aggregate, &ball)?;

                self.balls.save(ball.clone())?;
                let version = self.commit(&aggregate, expected, || {
                    self.balls.delete(ball.id_typed()).map(drop)
                })?;
                if let Some(ledger) = &self.ledger {
                    ledger.record_applied(match_id, ball.id_typed())?;
                }

                tracing::info!(
                    match_id = %match_id,
                    ball_id = %ball.id_typed(),
                    version,
                    runs = ball.runs_scored(),
                    no_ball = ball.is_no_ball(),
                    over = %aggregate.current_over(),
                    "ball added"
                );
                Ok((ball, aggregate))
            })
        })
    }

    /// Replace a recorded ball's outcome. The old values are reversed out of
    /// the match and the new ones applied in a single save.
    pub fn edit_ball(
        &self,
        ball_id: BallId,
        details: BallDetails,
    ) -> Result<(BallEvent, MatchAggregate), ServiceError> {
        self.run("edit_ball", || {
            let match_id = self.match_of(ball_id)?;
            self.with_match_locked(match_id, || {
                let (old, StoredMatch { mut aggregate, version }) =
                    self.load_ball_and_match(ball_id)?;

                let updated = engine::edit_event(&mut aggregate, &old, details)?;

                self.balls.save(updated.clone())?;
                let version = self.commit(&aggregate, ExpectedVersion::Exact(version), || {
                    self.balls.save(old.clone())
                })?;

                tracing::info!(
                    match_id = %match_id,
                    ball_id = %ball_id,
                    version,
                    old_runs = old.runs_scored(),
                    new_runs = updated.runs_scored(),
                    "ball edited"
                );
                Ok((updated, aggregate))
            })
        })
    }

    /// Remove a ball after reversing its effect on the match.
    pub fn delete_ball(&self, ball_id: BallId) -> Result<MatchAggregate, ServiceError> {
        self.run("delete_ball", || {
            let match_id = self.match_of(ball_id)?;
            self.with_match_locked(match_id, || {
                let (ball, StoredMatch { mut aggregate, version }) =
                    self.load_ball_and_match(ball_id)?;

                engine::delete_event(&mut aggregate, &ball)?;

                self.balls.delete(ball_id)?;
                let version = self.commit(&aggregate, ExpectedVersion::Exact(version), || {
                    self.balls.save(ball.clone())
                })?;
                if let Some(ledger) = &self.ledger {
                    ledger.record_reversed(match_id, ball_id)?;
                }

                tracing::info!(match_id = %match_id, ball_id = %ball_id, version, "ball deleted");
                Ok(aggregate)
            })
        })
    }

    /// Delete a match and every ball recorded for it. Returns the number of
    /// balls removed.
    pub fn delete_match(&self, match_id: MatchId) -> Result<usize, ServiceError> {
        self.run("delete_match", || {
            self.with_match_locked(match_id, || {
                if !self.matches.delete(match_id)? {
                    return Err(DomainError::not_found("match").into());
                }
                let removed = self.balls.delete_for_match(match_id)?;
                if let Some(ledger) = &self.ledger {
                    ledger.forget_match(match_id)?;
                }

                tracing::info!(match_id = %match_id, balls = removed, "match deleted");
                Ok(removed)
            })
        })
    }

    pub fn match_details(&self, match_id: MatchId) -> Result<MatchDetails, ServiceError> {
        let stored = self
            .matches
            .get(match_id)?
            .ok_or(DomainError::not_found("match"))?;
        self.details_for(stored)
    }

    /// Every stored match with its balls.
    pub fn all_matches(&self) -> Result<Vec<MatchDetails>, ServiceError> {
        self.matches
            .list()?
            .into_iter()
            .map(|stored| self.details_for(stored))
            .collect()
    }

    /// Rebuild the match from its stored balls and compare with the
    /// incrementally maintained aggregate.
    pub fn verify_match(&self, match_id: MatchId) -> Result<(), ServiceError> {
        self.run("verify_match", || {
            let MatchDetails {
                aggregate,
                ball_by_ball_data,
            } = self.match_details(match_id)?;
            check_against_replay(&aggregate, &ball_by_ball_data)
        })
    }

    fn details_for(&self, stored: StoredMatch) -> Result<MatchDetails, ServiceError> {
        let ball_by_ball_data = self.balls.list_for_match(stored.aggregate.id_typed())?;
        Ok(MatchDetails {
            aggregate: stored.aggregate,
            ball_by_ball_data,
        })
    }

    /// The match a ball belongs to, read before that match is locked. Callers
    /// load the ball again under the lock.
    fn match_of(&self, ball_id: BallId) -> Result<MatchId, ServiceError> {
        let ball = self
            .balls
            .get(ball_id)?
            .ok_or(DomainError::not_found("ball"))?;
        Ok(ball.match_id())
    }

    /// Call with the ball's match locked.
    fn load_ball_and_match(&self, ball_id: BallId) -> Result<(BallEvent, StoredMatch), ServiceError> {
        let ball = self
            .balls
            .get(ball_id)?
            .ok_or(DomainError::not_found("ball"))?;
        let stored = self
            .matches
            .get(ball.match_id())?
            .ok_or(DomainError::not_found("match"))?;
        self.sync_ledger(&stored.aggregate)?;
        if let Some(ledger) = &self.ledger {
            ledger.ensure_applied(ball.match_id(), ball_id)?;
        }
        Ok((ball, stored))
    }

    /// Start tracking a stored match this service has not touched yet. Its
    /// stored balls are taken as applied only if replaying them reproduces
    /// the stored figures.
    fn sync_ledger(&self, aggregate: &MatchAggregate) -> Result<(), ServiceError> {
        let Some(ledger) = &self.ledger else {
            return Ok(());
        };
        let match_id = aggregate.id_typed();
        if ledger.is_tracked(match_id)? {
            return Ok(());
        }

        let balls = self.balls.list_for_match(match_id)?;
        check_against_replay(aggregate, &balls)?;
        ledger.seed(match_id, balls.iter().map(BallEvent::id_typed))?;
        tracing::debug!(match_id = %match_id, balls = balls.len(), "applied-ball ledger seeded from storage");
        Ok(())
    }

    /// Save the match. When that fails, `undo` reverts the ball write made
    /// earlier in the same operation.
    fn commit(
        &self,
        aggregate: &MatchAggregate,
        expected: ExpectedVersion,
        undo: impl FnOnce() -> Result<(), StoreError>,
    ) -> Result<u64, ServiceError> {
        match self.matches.save(aggregate.clone(), expected) {
            Ok(version) => Ok(version),
            Err(err) => {
                if let Err(undo_err) = undo() {
                    tracing::error!(
                        match_id = %aggregate.id_typed(),
                        error = %undo_err,
                        "ball write could not be undone after a failed match save"
                    );
                }
                Err(err.into())
            }
        }
    }

    fn with_match_locked<T>(
        &self,
        match_id: MatchId,
        body: impl FnOnce() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let lock = self.locks.for_match(match_id)?;
        let _guard = lock.lock().map_err(|_| StoreError::Poisoned("match lock"))?;
        body()
    }

    fn run<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let result = body();
        match &result {
            Err(err @ ServiceError::InconsistentState(_)) => {
                tracing::error!(operation, error = %err, "scoring invariant violated");
            }
            Err(err) => {
                tracing::warn!(operation, error = %err, "scoring operation failed");
            }
            Ok(_) => {}
        }
        result
    }
}

fn check_against_replay(aggregate: &MatchAggregate, balls: &[BallEvent]) -> Result<(), ServiceError> {
    let rebuilt = engine::replay(aggregate.id_typed(), aggregate.started_at(), balls)?;
    if rebuilt != *aggregate {
        return Err(ServiceError::InconsistentState(format!(
            "match {}: stored figures differ from a replay of {} balls",
            aggregate.id_typed(),
            balls.len()
        )));
    }
    Ok(())
}
