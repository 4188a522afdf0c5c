//! Storage boundary for matches and balls.
//!
//! The engine never performs lookups itself; these traits are the "find by
//! id" / "find all for a match" collaborators it is driven through. Match
//! writes carry an [`ExpectedVersion`](crease_core::ExpectedVersion) so that
//! only one read-modify-write per match can win.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryBallStore, InMemoryMatchStore};
pub use r#trait::{BallStore, MatchStore, StoreError, StoredMatch};
