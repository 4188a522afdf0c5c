//! Over marker: `"{completed overs}.{balls into the current over}"`.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crease_core::{DomainError, ValueObject};

/// Legal deliveries in one over.
pub const BALLS_PER_OVER: u32 = 6;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Over {
    completed: u32,
    balls: u32,
}

impl ValueObject for Over {}

impl Over {
    pub fn from_legal_balls(legal_balls: u32) -> Self {
        Self {
            completed: legal_balls / BALLS_PER_OVER,
            balls: legal_balls % BALLS_PER_OVER,
        }
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn balls(&self) -> u32 {
        self.balls
    }

    /// Every `Over` comes from a `u32` ball count, so this cannot overflow.
    pub fn legal_balls(&self) -> u32 {
        self.completed * BALLS_PER_OVER + self.balls
    }
}

impl core::fmt::Display for Over {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.completed, self.balls)
    }
}

impl FromStr for Over {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(format!("invalid over marker: {s:?}"));
        let (completed, balls) = s.split_once('.').ok_or_else(invalid)?;
        let completed: u32 = completed.parse().map_err(|_| invalid())?;
        let balls: u32 = balls.parse().map_err(|_| invalid())?;
        if balls >= BALLS_PER_OVER {
            return Err(invalid());
        }
        // Reject markers no u32 ball count can produce.
        completed
            .checked_mul(BALLS_PER_OVER)
            .and_then(|whole| whole.checked_add(balls))
            .ok_or_else(invalid)?;
        Ok(Self { completed, balls })
    }
}

impl Serialize for Over {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Over {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
