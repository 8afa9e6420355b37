//! Per learner-item scheduling state.
use super::sm2::INITIAL_EASINESS;
use super::Stage;
use crate::error::{Result, SrsError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to a learned item. Never dereferenced by the scheduler.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

/// Owner of a set of scheduling states.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }
    };
}

string_id!(ItemId);
string_id!(UserId);

/// SM-2 state for one item.
///
/// The field aliases let progress files written by the older web client
/// (`wordId`, `easiness`, `nextReviewDate`) load unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    #[serde(alias = "wordId")]
    pub item_id: ItemId,
    #[serde(alias = "easiness")]
    pub easiness_factor: f64,
    /// Days until the next review.
    pub interval: u32,
    /// Consecutive successful reviews.
    pub repetitions: u32,
    #[serde(alias = "nextReviewDate", with = "chrono::serde::ts_milliseconds")]
    pub next_review_at: DateTime<Utc>,
}

impl ReviewState {
    /// State of an item that has never been reviewed. It is due immediately.
    pub fn new(item_id: ItemId, now: DateTime<Utc>) -> Self {
        Self {
            item_id,
            easiness_factor: INITIAL_EASINESS,
            interval: 0,
            repetitions: 0,
            next_review_at: now,
        }
    }

    /// Builds a state from raw stored values, rejecting anything the
    /// scheduler cannot work with.
    pub fn from_parts(
        item_id: ItemId,
        easiness_factor: f64,
        interval: i64,
        repetitions: i64,
        next_review_at: DateTime<Utc>,
    ) -> Result<Self> {
        let interval = u32::try_from(interval).map_err(|_| {
            SrsError::InvalidInput(format!("interval for '{}' out of range: {}", item_id, interval))
        })?;
        let repetitions = u32::try_from(repetitions).map_err(|_| {
            SrsError::InvalidInput(format!(
                "repetitions for '{}' out of range: {}",
                item_id, repetitions
            ))
        })?;

        let state = Self {
            item_id,
            easiness_factor,
            interval,
            repetitions,
            next_review_at,
        };
        state.validate()?;
        Ok(state)
    }

    /// Checks the invariants a prior state must satisfy before scheduling.
    pub fn validate(&self) -> Result<()> {
        if !self.easiness_factor.is_finite() || self.easiness_factor < 0.0 {
            return Err(SrsError::InvalidInput(format!(
                "easiness factor for '{}' must be a non-negative finite number, got {}",
                self.item_id, self.easiness_factor
            )));
        }
        Ok(())
    }

    /// Due once the current time reaches `next_review_at`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review_at
    }

    pub fn stage(&self) -> Stage {
        Stage::of(self)
    }
}
