//! Ball-by-ball scoring domain.
//!
//! This crate holds the scoring model and the reversible aggregation engine,
//! implemented purely as deterministic domain logic (no IO, no storage, no
//! logging). Callers load state, call into [`engine`], and persist the result.

pub mod aggregate;
pub mod ball;
pub mod engine;
pub mod over;
pub mod stats;

pub use aggregate::MatchAggregate;
pub use ball::{BallDetails, BallEvent};
pub use over::{BALLS_PER_OVER, Over};
pub use stats::{BatsmanStats, BowlerStats};
