//! Value object trait: equality by value, not identity.
//!
//! Player figures (`BatsmanStats`, `BowlerStats`), the over marker and the
//! ball input tuple are value objects: two with the same values are
//! interchangeable, and "changing" one means replacing it with a new value.

/// Marker trait for value objects.
///
/// Requires:
/// - **Clone**: value objects are cheap to copy
/// - **PartialEq**: compared by their attribute values (rates are `f64`, so
///   `Eq` is not required)
/// - **Debug**: shows up in logs and test failures
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
