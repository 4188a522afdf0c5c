//! Per-player figures and the rate formulas shared with the team totals.
//!
//! Every rate here is defined as `0.0` when its denominator is zero. The
//! check is explicit; nothing relies on NaN/∞ propagation.

use serde::{Deserialize, Serialize};

use crease_core::ValueObject;

use crate::over::BALLS_PER_OVER;

/// Runs per 100 balls faced.
pub fn strike_rate(runs: u32, balls_faced: u32) -> f64 {
    if balls_faced == 0 {
        return 0.0;
    }
    f64::from(runs) / f64::from(balls_faced) * 100.0
}

/// Runs per over of legal deliveries. Used for both bowler economy and the
/// team's current run rate.
pub fn runs_per_over(runs: u32, legal_balls: u32) -> f64 {
    if legal_balls == 0 {
        return 0.0;
    }
    f64::from(runs) / (f64::from(legal_balls) / f64::from(BALLS_PER_OVER))
}

/// Batting figures for one striker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatsmanStats {
    runs: u32,
    balls_faced: u32,
    strike_rate: f64,
}

impl ValueObject for BatsmanStats {}

impl BatsmanStats {
    pub fn new(runs: u32, balls_faced: u32) -> Self {
        Self {
            runs,
            balls_faced,
            strike_rate: strike_rate(runs, balls_faced),
        }
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    pub fn balls_faced(&self) -> u32 {
        self.balls_faced
    }

    pub fn strike_rate(&self) -> f64 {
        self.strike_rate
    }

    /// Figures after facing one more ball. The ball counts as faced even
    /// when it is a no-ball. `None` on overflow.
    pub(crate) fn credited(&self, runs: u32) -> Option<Self> {
        Some(Self::new(
            self.runs.checked_add(runs)?,
            self.balls_faced.checked_add(1)?,
        ))
    }

    /// Exact inverse of [`Self::credited`]. `None` on underflow.
    pub(crate) fn debited(&self, runs: u32) -> Option<Self> {
        Some(Self::new(
            self.runs.checked_sub(runs)?,
            self.balls_faced.checked_sub(1)?,
        ))
    }

    /// No ball is attributed to this striker any more.
    pub fn is_empty(&self) -> bool {
        self.runs == 0 && self.balls_faced == 0
    }
}

/// Bowling figures for one bowler.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BowlerStats {
    runs_conceded: u32,
    deliveries: u32,
    no_balls: u32,
    economy_rate: f64,
}

impl ValueObject for BowlerStats {}

impl BowlerStats {
    pub fn new(runs_conceded: u32, deliveries: u32, no_balls: u32) -> Self {
        Self {
            runs_conceded,
            deliveries,
            no_balls,
            economy_rate: runs_per_over(runs_conceded, deliveries),
        }
    }

    pub fn runs_conceded(&self) -> u32 {
        self.runs_conceded
    }

    /// Legal deliveries bowled.
    pub fn deliveries(&self) -> u32 {
        self.deliveries
    }

    pub fn no_balls(&self) -> u32 {
        self.no_balls
    }

    pub fn economy_rate(&self) -> f64 {
        self.economy_rate
    }

    pub(crate) fn charged(&self, runs: u32, is_no_ball: bool) -> Option<Self> {
        let (legal, illegal) = split_delivery(is_no_ball);
        Some(Self::new(
            self.runs_conceded.checked_add(runs)?,
            self.deliveries.checked_add(legal)?,
            self.no_balls.checked_add(illegal)?,
        ))
    }

    pub(crate) fn discharged(&self, runs: u32, is_no_ball: bool) -> Option<Self> {
        let (legal, illegal) = split_delivery(is_no_ball);
        Some(Self::new(
            self.runs_conceded.checked_sub(runs)?,
            self.deliveries.checked_sub(legal)?,
            self.no_balls.checked_sub(illegal)?,
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.runs_conceded == 0 && self.deliveries == 0 && self.no_balls == 0
    }
}

fn split_delivery(is_no_ball: bool) -> (u32, u32) {
    if is_no_ball { (0, 1) } else { (1, 0) }
}
