//! SM-2 (SuperMemo 2) spaced repetition scheduling.
//!
//! For every review the learner grades recall from 0 to 5:
//! - Grades 3-5 extend the streak: 1 day, then 6 days, then the previous
//!   interval multiplied by the easiness factor (EF) and rounded
//! - Grades 0-2 are lapses: streak back to 0, review again tomorrow
//! - EF is adjusted after every review, pass or fail, and never drops below 1.3
//!
//! Scheduling is a pure function of the prior state, the grade and the
//! supplied time. Nothing here logs, persists or reads the wall clock.

use super::{Clock, ItemId, Quality, ReviewState};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};

/// EF of an item that has never been reviewed.
pub const INITIAL_EASINESS: f64 = 2.5;
/// EF floor.
pub const MIN_EASINESS: f64 = 1.3;
/// One scheduling day, fixed length with no calendar adjustment.
pub const DAY_MS: i64 = 86_400_000;

/// Computes the state that follows a review graded `quality` at `now`.
///
/// `previous` of `None` means the item was never reviewed and is treated as
/// `{EF 2.5, interval 0, repetitions 0}`. When a prior state is given its
/// `item_id` is carried forward and `item_id` is ignored.
pub fn schedule(
    previous: Option<&ReviewState>,
    item_id: &ItemId,
    quality: Quality,
    now: DateTime<Utc>,
) -> Result<ReviewState> {
    let prior = match previous {
        Some(state) => {
            state.validate()?;
            state.clone()
        }
        None => ReviewState::new(item_id.clone(), now),
    };

    let (interval, repetitions) = if quality.is_success() {
        let interval = match prior.repetitions {
            0 => 1,
            1 => 6,
            // Grows by the EF the item had going into this review
            _ => grow_interval(prior.interval, prior.easiness_factor),
        };
        (interval, prior.repetitions.saturating_add(1))
    } else {
        (1, 0)
    };

    let easiness_factor = next_easiness(prior.easiness_factor, quality);

    Ok(ReviewState {
        item_id: prior.item_id,
        easiness_factor,
        interval,
        repetitions,
        next_review_at: next_review_at(now, interval),
    })
}

/// Same as [`schedule`] for callers holding an unchecked integer grade.
pub fn schedule_raw(
    previous: Option<&ReviewState>,
    item_id: &ItemId,
    quality: i64,
    now: DateTime<Utc>,
) -> Result<ReviewState> {
    schedule(previous, item_id, Quality::try_from(quality)?, now)
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3
pub fn next_easiness(easiness_factor: f64, quality: Quality) -> f64 {
    let miss = 5.0 - f64::from(quality.value());
    let updated = easiness_factor + (0.1 - miss * (0.08 + miss * 0.02));
    if updated < MIN_EASINESS {
        MIN_EASINESS
    } else {
        updated
    }
}

/// `now` plus `interval` fixed-length days, pinned to the latest
/// representable instant.
pub fn next_review_at(now: DateTime<Utc>, interval: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::milliseconds(i64::from(interval) * DAY_MS))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Rounds half away from zero; the result saturates instead of wrapping.
fn grow_interval(interval: u32, easiness_factor: f64) -> u32 {
    let grown = (f64::from(interval) * easiness_factor).round();
    if grown >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        (grown as u32).max(1)
    }
}

/// Scheduler bound to a clock.
#[derive(Clone, Debug, Default)]
pub struct Scheduler<C> {
    clock: C,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn review(
        &self,
        previous: Option<&ReviewState>,
        item_id: &ItemId,
        quality: Quality,
    ) -> Result<ReviewState> {
        schedule(previous, item_id, quality, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SrsError;
    use crate::models::FixedClock;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 30, 22, 0, 0).unwrap()
    }

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    fn review(easiness_factor: f64, interval: u32, repetitions: u32) -> ReviewState {
        ReviewState {
            item_id: "w1".into(),
            easiness_factor,
            interval,
            repetitions,
            next_review_at: now(),
        }
    }

    fn item() -> ItemId {
        "w1".into()
    }

    #[test]
    fn test_first_review() {
        let next = schedule(None, &item(), q(4), now()).unwrap();
        assert_eq!(next.interval, 1);
        assert_eq!(next.repetitions, 1);
        assert_eq!(next.item_id, item());
    }

    #[test]
    fn test_first_review_lapse() {
        let next = schedule(None, &item(), q(0), now()).unwrap();
        assert_eq!(next.interval, 1);
        assert_eq!(next.repetitions, 0);
        // 2.5 + (0.1 - 5 * (0.08 + 5 * 0.02)) = 1.7
        assert!((next.easiness_factor - 1.7).abs() < 1e-9);
    }

    #[test]
    fn test_second_review() {
        let next = schedule(Some(&review(2.5, 1, 1)), &item(), q(4), now()).unwrap();
        assert_eq!(next.interval, 6);
        assert_eq!(next.repetitions, 2);
    }

    #[test]
    fn test_third_review_multiplies_interval() {
        let next = schedule(Some(&review(2.5, 6, 2)), &item(), q(4), now()).unwrap();
        assert_eq!(next.interval, 15);
        assert_eq!(next.repetitions, 3);
        assert!((next.easiness_factor - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_growth_uses_easiness_before_update() {
        // Quality 5 would raise EF to 2.1, but 10 * 2.0 = 20 is what counts
        let next = schedule(Some(&review(2.0, 10, 3)), &item(), q(5), now()).unwrap();
        assert_eq!(next.interval, 20);
        assert!((next.easiness_factor - 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_growth_rounds_to_nearest() {
        // 15 * 2.36 = 35.4
        let down = schedule(Some(&review(2.36, 15, 3)), &item(), q(4), now()).unwrap();
        assert_eq!(down.interval, 35);
        // 15 * 1.3 = 19.5
        let half = schedule(Some(&review(1.3, 15, 3)), &item(), q(4), now()).unwrap();
        assert_eq!(half.interval, 20);
        // 7 * 1.3 = 9.1
        let small = schedule(Some(&review(1.3, 7, 4)), &item(), q(3), now()).unwrap();
        assert_eq!(small.interval, 9);
    }

    #[test]
    fn test_quality_below_3_resets() {
        for grade in 0..3 {
            let next = schedule(Some(&review(2.5, 10, 5)), &item(), q(grade), now()).unwrap();
            assert_eq!(next.interval, 1);
            assert_eq!(next.repetitions, 0);
            // EF should still be updated
            assert!(next.easiness_factor < 2.5);
        }
    }

    #[test]
    fn test_easiness_delta_per_quality() {
        let expected = [-0.8, -0.54, -0.32, -0.14, 0.0, 0.1];
        for (grade, delta) in expected.iter().enumerate() {
            let next = next_easiness(2.5, q(grade as u8));
            assert!(
                (next - (2.5 + delta)).abs() < 1e-9,
                "quality {} gave {}",
                grade,
                next
            );
        }
    }

    #[test]
    fn test_ef_floor() {
        for grade in 0..=5 {
            let next = schedule(Some(&review(1.3, 1, 1)), &item(), q(grade), now()).unwrap();
            assert!(next.easiness_factor >= MIN_EASINESS);
        }
        let floored = schedule(Some(&review(1.4, 6, 2)), &item(), q(0), now()).unwrap();
        assert_eq!(floored.easiness_factor, MIN_EASINESS);
    }

    #[test]
    fn test_next_review_is_whole_days_from_now() {
        // Crosses the EU daylight saving switch; days stay 24h long
        let next = schedule(Some(&review(2.5, 1, 1)), &item(), q(5), now()).unwrap();
        assert_eq!(next.interval, 6);
        assert_eq!(
            next.next_review_at.timestamp_millis() - now().timestamp_millis(),
            6 * DAY_MS
        );
    }

    #[test]
    fn test_prior_item_id_is_carried_forward() {
        let other: ItemId = "w2".into();
        let next = schedule(Some(&review(2.5, 1, 1)), &other, q(4), now()).unwrap();
        assert_eq!(next.item_id, item());
    }

    #[test]
    fn test_rejects_corrupt_prior() {
        let mut prior = review(f64::NAN, 6, 2);
        assert!(matches!(
            schedule(Some(&prior), &item(), q(4), now()),
            Err(SrsError::InvalidInput(_))
        ));
        prior.easiness_factor = -1.0;
        assert!(schedule(Some(&prior), &item(), q(4), now()).is_err());
    }

    #[test]
    fn test_raw_quality_is_validated() {
        assert!(matches!(
            schedule_raw(None, &item(), 6, now()),
            Err(SrsError::InvalidInput(_))
        ));
        assert!(schedule_raw(None, &item(), -1, now()).is_err());
        assert_eq!(schedule_raw(None, &item(), 5, now()).unwrap().repetitions, 1);
    }

    #[test]
    fn test_deterministic_but_not_idempotent() {
        let prior = review(2.5, 6, 2);
        let first = schedule(Some(&prior), &item(), q(4), now()).unwrap();
        let again = schedule(Some(&prior), &item(), q(4), now()).unwrap();
        assert_eq!(first, again);

        let forward = schedule(Some(&first), &item(), q(4), now()).unwrap();
        assert_ne!(forward, first);
    }

    #[test]
    fn test_interval_saturates() {
        let next = schedule(Some(&review(2.5, u32::MAX / 2, 9)), &item(), q(5), now()).unwrap();
        assert_eq!(next.interval, u32::MAX);
        assert_eq!(next.next_review_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_review_sequence() {
        let mut state: Option<ReviewState> = None;
        let mut intervals = Vec::new();
        let mut repetitions = Vec::new();
        let mut easiness = Vec::new();

        for grade in [4, 4, 4, 2] {
            let next = schedule(state.as_ref(), &item(), q(grade), now()).unwrap();
            intervals.push(next.interval);
            repetitions.push(next.repetitions);
            easiness.push(next.easiness_factor);
            state = Some(next);
        }

        assert_eq!(intervals, vec![1, 6, 15, 1]);
        assert_eq!(repetitions, vec![1, 2, 3, 0]);
        assert!(easiness[..3].iter().all(|ef| (ef - 2.5).abs() < 1e-9));
        assert!((easiness[3] - 2.18).abs() < 1e-9);
    }

    #[test]
    fn test_scheduler_uses_its_clock() {
        let clock = FixedClock::new(now());
        let scheduler = Scheduler::new(&clock);

        let first = scheduler.review(None, &item(), q(4)).unwrap();
        assert_eq!(first.next_review_at, now() + Duration::days(1));

        clock.advance_days(1);
        let second = scheduler.review(Some(&first), &item(), q(4)).unwrap();
        assert_eq!(second.next_review_at, now() + Duration::days(7));
    }
}
