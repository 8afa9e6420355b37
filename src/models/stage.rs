//! Qualitative bands an item moves through as it is reviewed.
use super::ReviewState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Never reviewed.
    New,
    /// One successful review.
    Learning,
    /// Two or more consecutive successes, interval grows by the easiness factor.
    Reviewing,
    /// Last review failed. Streak is gone, decayed easiness is kept.
    Lapsed,
}

impl Stage {
    pub fn of(state: &ReviewState) -> Self {
        match (state.repetitions, state.interval) {
            (0, 0) => Stage::New,
            (0, _) => Stage::Lapsed,
            (1, _) => Stage::Learning,
            _ => Stage::Reviewing,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::New => "new",
            Stage::Learning => "learning",
            Stage::Reviewing => "reviewing",
            Stage::Lapsed => "lapsed",
        };
        f.pad(name)
    }
}

/// Tally of a learner's items per stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub new: usize,
    pub learning: usize,
    pub reviewing: usize,
    pub lapsed: usize,
    pub due: usize,
}

impl StageCounts {
    pub fn from_states<'a>(
        states: impl IntoIterator<Item = &'a ReviewState>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut counts = Self::default();
        for state in states {
            match state.stage() {
                Stage::New => counts.new += 1,
                Stage::Learning => counts.learning += 1,
                Stage::Reviewing => counts.reviewing += 1,
                Stage::Lapsed => counts.lapsed += 1,
            }
            if state.is_due(now) {
                counts.due += 1;
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.new + self.learning + self.reviewing + self.lapsed
    }
}
