//! Infrastructure layer: storage, configuration, and the scoring service that
//! wires the pure engine to them.

pub mod config;
pub mod ledger;
pub mod service;
pub mod store;


pub use config::{ConfigError, ScoringConfig};
pub use ledger::{AppliedLedger, LedgerError};
pub use service::{MatchDetails, ScoringService, ServiceError};
pub use store::{BallStore, InMemoryBallStore, InMemoryMatchStore, MatchStore, StoreError, StoredMatch};
