//! `crease-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the domain error model, and the small traits the scoring
//! model is expressed in.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion, Reversible};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BallId, MatchId};
pub use value_object::ValueObject;
