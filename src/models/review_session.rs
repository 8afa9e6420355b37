//! Review session management for spaced repetition practice.
//! Drives multi-round review of due items with SM-2 scheduling.

use super::{Clock, ItemId, Quality, ReviewState, SessionCard, UserId, sm2};
use crate::database::ReviewRepository;
use crate::error::{Result, SrsError};
use std::collections::HashSet;
use tracing::{debug, info};

/// Manages a review session with multiple rounds.
/// Items that lapse (grade < 3) are repeated in subsequent rounds.
pub struct ReviewSession<R, C> {
    user: UserId,
    cards: Vec<SessionCard>,
    current_round: Vec<usize>,
    current_index: usize,
    round_number: usize,
    repo: R,
    clock: C,
}

impl<R: ReviewRepository, C: Clock> ReviewSession<R, C> {
    /// Starts a session over every item of `user` that is due now.
    pub fn start(user: UserId, repo: R, clock: C) -> Result<Self> {
        let due = repo.due(&user, clock.now())?;
        info!(user = %user, due = due.len(), "Starting review session");
        Ok(Self::with_states(user, due, repo, clock))
    }

    /// Starts a session over the given items, due or not. Items without a
    /// stored state begin as brand-new. Repeated ids are reviewed once.
    pub fn from_items(
        user: UserId,
        items: impl IntoIterator<Item = ItemId>,
        repo: R,
        clock: C,
    ) -> Result<Self> {
        let now = clock.now();
        let mut seen = HashSet::new();
        let states = items
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .map(|item| {
                Ok(repo
                    .load(&user, &item)?
                    .unwrap_or_else(|| ReviewState::new(item, now)))
            })
            .collect::<Result<Vec<_>>>()?;
        info!(user = %user, items = states.len(), "Starting review session");
        Ok(Self::with_states(user, states, repo, clock))
    }

    fn with_states(user: UserId, states: Vec<ReviewState>, repo: R, clock: C) -> Self {
        let cards: Vec<_> = states.into_iter().map(SessionCard::new).collect();
        let indices = (0..cards.len()).collect();

        Self {
            user,
            cards,
            current_round: indices,
            current_index: 0,
            round_number: 1,
            repo,
            clock,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn current(&self) -> Option<&ReviewState> {
        self.current_card().map(|card| &card.state)
    }

    fn current_card(&self) -> Option<&SessionCard> {
        self.current_round
            .get(self.current_index)
            .and_then(|&idx| self.cards.get(idx))
    }

    /// Grades the current item, persists its new schedule and moves on.
    /// Items graded 3 or higher count as passed for this session.
    pub fn grade(&mut self, quality: Quality) -> Result<ReviewState> {
        let idx = *self
            .current_round
            .get(self.current_index)
            .ok_or_else(|| SrsError::NotFound("no item left to review".to_string()))?;
        let now = self.clock.now();
        let card = self
            .cards
            .get_mut(idx)
            .ok_or_else(|| SrsError::NotFound(format!("session card {}", idx)))?;

        let next = sm2::schedule(Some(&card.state), &card.state.item_id, quality, now)?;
        self.repo.save(&self.user, &next)?;

        if quality.is_success() {
            card.mark_as_passed();
        } else {
            card.passed = false;
        }
        card.state = next.clone();

        debug!(
            item = %next.item_id,
            quality = %quality,
            interval = next.interval,
            repetitions = next.repetitions,
            "Graded item"
        );

        self.advance();
        Ok(next)
    }

    fn advance(&mut self) {
        self.current_index += 1;
        if self.current_index >= self.current_round.len() {
            self.start_next_round();
        }
    }

    /// Starts a new round with the items that lapsed in this one.
    /// If none did, the session is complete.
    fn start_next_round(&mut self) {
        let failed: Vec<usize> = self
            .current_round
            .iter()
            .copied()
            .filter(|&idx| self.cards.get(idx).is_some_and(|card| !card.passed))
            .collect();

        if failed.is_empty() {
            info!(user = %self.user, rounds = self.round_number, "Review session complete");
            return;
        }

        self.current_round = failed;
        self.current_index = 0;
        self.round_number += 1;
        info!(
            round = self.round_number,
            retry = self.current_round.len(),
            "Starting retry round"
        );
    }

    pub fn round(&self) -> usize {
        self.round_number
    }

    pub fn passed_count(&self) -> usize {
        self.current_round
            .iter()
            .filter(|&&idx| self.cards.get(idx).is_some_and(|card| card.passed))
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.current_round.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.passed_count()
    }

    /// True when the round is empty or every item in it has passed.
    pub fn is_completed(&self) -> bool {
        self.current_round.is_empty() || self.passed_count() == self.total_count()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} items", self.round_number, self.total_count())
        } else {
            format!(
                "Round {} (Review): {} items to retry",
                self.round_number,
                self.total_count()
            )
        }
    }

    pub fn into_repository(self) -> R {
        self.repo
    }
}
