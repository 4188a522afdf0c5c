use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crease_core::{AggregateRoot, DomainResult, MatchId, Reversible};

use crate::ball::BallEvent;
use crate::engine;
use crate::over::Over;
use crate::stats::{self, BatsmanStats, BowlerStats};

/// Aggregate root: running match state folded over the currently-applied
/// balls.
///
/// No list of applied ball ids is kept here. The fold stays faithful only
/// because every [`engine::apply`] is paired with exactly one
/// [`engine::reverse`] of the same values; storage can track the applied set
/// separately if it wants to check that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAggregate {
    pub(crate) id: MatchId,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) team_runs: u32,
    pub(crate) team_balls_played: u32,
    pub(crate) batsman_stats: BTreeMap<String, BatsmanStats>,
    pub(crate) bowler_stats: BTreeMap<String, BowlerStats>,
    pub(crate) current_run_rate: f64,
    pub(crate) current_over: Over,
}

impl MatchAggregate {
    /// A match with no balls applied, started at `started_at`.
    pub fn empty(id: MatchId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            started_at,
            team_runs: 0,
            team_balls_played: 0,
            batsman_stats: BTreeMap::new(),
            bowler_stats: BTreeMap::new(),
            current_run_rate: 0.0,
            current_over: Over::default(),
        }
    }

    pub fn id_typed(&self) -> MatchId {
        self.id
    }

    /// When the first ball was recorded. Never moved by apply or reverse.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn team_runs(&self) -> u32 {
        self.team_runs
    }

    /// Legal deliveries only.
    pub fn team_balls_played(&self) -> u32 {
        self.team_balls_played
    }

    pub fn current_run_rate(&self) -> f64 {
        self.current_run_rate
    }

    pub fn current_over(&self) -> Over {
        self.current_over
    }

    pub fn batsman(&self, name: &str) -> Option<&BatsmanStats> {
        self.batsman_stats.get(name)
    }

    pub fn bowler(&self, name: &str) -> Option<&BowlerStats> {
        self.bowler_stats.get(name)
    }

    pub fn batsman_stats(&self) -> &BTreeMap<String, BatsmanStats> {
        &self.batsman_stats
    }

    pub fn bowler_stats(&self) -> &BTreeMap<String, BowlerStats> {
        &self.bowler_stats
    }

    /// True when no ball is reflected in the totals.
    pub fn is_empty(&self) -> bool {
        self.team_runs == 0
            && self.team_balls_played == 0
            && self.batsman_stats.is_empty()
            && self.bowler_stats.is_empty()
    }

    pub(crate) fn recompute_derived(&mut self) {
        self.current_run_rate = stats::runs_per_over(self.team_runs, self.team_balls_played);
        self.current_over = Over::from_legal_balls(self.team_balls_played);
    }
}

impl AggregateRoot for MatchAggregate {
    type Id = MatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Reversible for MatchAggregate {
    type Event = BallEvent;

    fn apply(&mut self, event: &Self::Event) -> DomainResult<()> {
        engine::apply(self, event)
    }

    fn reverse(&mut self, event: &Self::Event) -> DomainResult<()> {
        engine::reverse(self, event)
    }
}
