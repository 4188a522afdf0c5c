use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crease_core::{BallId, DomainError, DomainResult, Entity, MatchId, ValueObject};

/// Outcome of one delivery, as supplied by the caller for an add or an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallDetails {
    pub runs_scored: u32,
    pub striker_name: String,
    pub non_striker_name: String,
    pub bowler_name: String,
    pub is_no_ball: bool,
}

impl ValueObject for BallDetails {}

impl BallDetails {
    pub fn new(
        runs_scored: u32,
        striker_name: impl Into<String>,
        non_striker_name: impl Into<String>,
        bowler_name: impl Into<String>,
        is_no_ball: bool,
    ) -> Self {
        Self {
            runs_scored,
            striker_name: striker_name.into(),
            non_striker_name: non_striker_name.into(),
            bowler_name: bowler_name.into(),
            is_no_ball,
        }
    }

    /// Reject blank player names. Runs are non-negative by type.
    pub fn validate(&self) -> DomainResult<()> {
        for (field, value) in [
            ("strikerName", &self.striker_name),
            ("nonStrikerName", &self.non_striker_name),
            ("bowlerName", &self.bowler_name),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!("{field} cannot be empty")));
            }
        }
        Ok(())
    }

    /// A legal delivery counts toward the over; a no-ball does not.
    pub fn is_legal_delivery(&self) -> bool {
        !self.is_no_ball
    }
}

/// A recorded delivery.
///
/// Fields are private: once recorded, the only way to change a ball is
/// [`crate::engine::edit_event`], which reverses the old values out of the
/// match before applying the new ones. Equality and hashing go by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallEvent {
    id: BallId,
    match_id: MatchId,
    #[serde(flatten)]
    details: BallDetails,
    recorded_at: DateTime<Utc>,
}

impl BallEvent {
    /// Record a new delivery for `match_id` under a fresh id.
    pub fn record(
        match_id: MatchId,
        details: BallDetails,
        recorded_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        details.validate()?;
        Ok(Self {
            id: BallId::new(),
            match_id,
            details,
            recorded_at,
        })
    }

    /// Same ball (id, match, timestamp) carrying new outcome values.
    pub(crate) fn with_details(&self, details: BallDetails) -> Self {
        Self {
            id: self.id,
            match_id: self.match_id,
            details,
            recorded_at: self.recorded_at,
        }
    }

    pub fn id_typed(&self) -> BallId {
        self.id
    }

    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    pub fn details(&self) -> &BallDetails {
        &self.details
    }

    pub fn runs_scored(&self) -> u32 {
        self.details.runs_scored
    }

    pub fn striker_name(&self) -> &str {
        &self.details.striker_name
    }

    pub fn non_striker_name(&self) -> &str {
        &self.details.non_striker_name
    }

    pub fn bowler_name(&self) -> &str {
        &self.details.bowler_name
    }

    pub fn is_no_ball(&self) -> bool {
        self.details.is_no_ball
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

impl Entity for BallEvent {
    type Id = BallId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl PartialEq for BallEvent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BallEvent {}

impl core::hash::Hash for BallEvent {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
