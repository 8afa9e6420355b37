//! Self-reported recall quality for a single review event.
use crate::error::{Result, SrsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Integer grade in `[0, 5]`. 0 = complete blackout, 5 = perfect instant recall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 5;
    /// Lowest grade that counts as a successful recall.
    pub const PASSING: u8 = 3;

    pub fn new(value: u8) -> Result<Self> {
        Self::try_from(i64::from(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Anything below 3 is a lapse.
    pub fn is_success(self) -> bool {
        self.0 >= Self::PASSING
    }
}

impl TryFrom<i64> for Quality {
    type Error = SrsError;

    fn try_from(value: i64) -> Result<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(SrsError::InvalidInput(format!(
                "quality must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl From<Rating> for Quality {
    fn from(rating: Rating) -> Self {
        Self(rating.quality_value())
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts either a digit (`"0"`..`"5"`) or a button name (`"good"`).
impl FromStr for Quality {
    type Err = SrsError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(number) = trimmed.parse::<i64>() {
            return Self::try_from(number);
        }
        trimmed.parse::<Rating>().map(Self::from)
    }
}

/// The four answer buttons shown after a card is revealed.
///
/// Grades 1 and 2 have no button but are still valid qualities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn quality_value(self) -> u8 {
        match self {
            Rating::Again => 0,
            Rating::Hard => 3,
            Rating::Good => 4,
            Rating::Easy => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        }
    }
}

impl FromStr for Rating {
    type Err = SrsError;

    fn from_str(s: &str) -> Result<Self> {
        Rating::ALL
            .into_iter()
            .find(|rating| rating.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SrsError::InvalidInput(format!("unknown rating '{}'", s.trim())))
    }
}
