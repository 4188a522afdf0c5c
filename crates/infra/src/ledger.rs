//! Applied-ball ledger: which balls each stored match currently reflects.
//!
//! The aggregate itself keeps no such list; it trusts that every apply is
//! paired with one reverse. The ledger makes that pairing checkable, so a
//! double apply or a reversal of a ball the match never saw is reported
//! before the engine runs instead of surfacing later as wrong figures.
//!
//! A match is tracked from the first time the service touches it. Matches
//! that were already stored when the service started are seeded from their
//! stored balls; see [`AppliedLedger::seed`].

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use thiserror::Error;

use crease_core::{BallId, MatchId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ball {ball_id} is already applied to match {match_id}")]
    AlreadyApplied { match_id: MatchId, ball_id: BallId },

    #[error("ball {ball_id} is not applied to match {match_id}")]
    NotApplied { match_id: MatchId, ball_id: BallId },

    #[error("applied-ball ledger lock poisoned")]
    Poisoned,
}

#[derive(Debug, Default)]
pub struct AppliedLedger {
    applied: RwLock<HashMap<MatchId, HashSet<BallId>>>,
}

impl AppliedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `match_id` has an applied set yet (possibly empty).
    pub fn is_tracked(&self, match_id: MatchId) -> Result<bool, LedgerError> {
        let applied = self.applied.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(applied.contains_key(&match_id))
    }

    /// Start tracking `match_id` with the balls it already reflects. A match
    /// that is tracked already keeps its set.
    pub fn seed(
        &self,
        match_id: MatchId,
        ball_ids: impl IntoIterator<Item = BallId>,
    ) -> Result<(), LedgerError> {
        let mut applied = self.applied.write().map_err(|_| LedgerError::Poisoned)?;
        applied
            .entry(match_id)
            .or_insert_with(|| ball_ids.into_iter().collect());
        Ok(())
    }

    /// Fails unless `ball_id` is currently applied to `match_id`.
    pub fn ensure_applied(&self, match_id: MatchId, ball_id: BallId) -> Result<(), LedgerError> {
        let applied = self.applied.read().map_err(|_| LedgerError::Poisoned)?;
        let present = applied
            .get(&match_id)
            .is_some_and(|balls| balls.contains(&ball_id));
        if present {
            Ok(())
        } else {
            Err(LedgerError::NotApplied { match_id, ball_id })
        }
    }

    pub fn record_applied(&self, match_id: MatchId, ball_id: BallId) -> Result<(), LedgerError> {
        let mut applied = self.applied.write().map_err(|_| LedgerError::Poisoned)?;
        if !applied.entry(match_id).or_default().insert(ball_id) {
            return Err(LedgerError::AlreadyApplied { match_id, ball_id });
        }
        Ok(())
    }

    pub fn record_reversed(&self, match_id: MatchId, ball_id: BallId) -> Result<(), LedgerError> {
        let mut applied = self.applied.write().map_err(|_| LedgerError::Poisoned)?;
        let removed = applied
            .get_mut(&match_id)
            .is_some_and(|balls| balls.remove(&ball_id));
        if !removed {
            return Err(LedgerError::NotApplied { match_id, ball_id });
        }
        Ok(())
    }

    /// Drop everything known about a match (delete-match).
    pub fn forget_match(&self, match_id: MatchId) -> Result<(), LedgerError> {
        let mut applied = self.applied.write().map_err(|_| LedgerError::Poisoned)?;
        applied.remove(&match_id);
        Ok(())
    }

    pub fn applied_count(&self, match_id: MatchId) -> Result<usize, LedgerError> {
        let applied = self.applied.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(applied.get(&match_id).map_or(0, HashSet::len))
    }
}
