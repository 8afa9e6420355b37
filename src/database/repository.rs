//! Storage abstraction for scheduling state, keyed by (user, item).
use crate::error::Result;
use crate::models::{ItemId, ReviewState, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Where review states live between sessions.
///
/// `save` is an upsert: the last write for a (user, item) pair wins. Nothing
/// orders concurrent reviews of the same item.
pub trait ReviewRepository {
    fn load(&self, user: &UserId, item: &ItemId) -> Result<Option<ReviewState>>;

    fn save(&mut self, user: &UserId, state: &ReviewState) -> Result<()>;

    /// States with `next_review_at <= now`, oldest first.
    fn due(&self, user: &UserId, now: DateTime<Utc>) -> Result<Vec<ReviewState>>;

    fn all(&self, user: &UserId) -> Result<Vec<ReviewState>>;

    /// Returns whether a state existed.
    fn remove(&mut self, user: &UserId, item: &ItemId) -> Result<bool>;
}

impl<R: ReviewRepository + ?Sized> ReviewRepository for &mut R {
    fn load(&self, user: &UserId, item: &ItemId) -> Result<Option<ReviewState>> {
        (**self).load(user, item)
    }

    fn save(&mut self, user: &UserId, state: &ReviewState) -> Result<()> {
        (**self).save(user, state)
    }

    fn due(&self, user: &UserId, now: DateTime<Utc>) -> Result<Vec<ReviewState>> {
        (**self).due(user, now)
    }

    fn all(&self, user: &UserId) -> Result<Vec<ReviewState>> {
        (**self).all(user)
    }

    fn remove(&mut self, user: &UserId, item: &ItemId) -> Result<bool> {
        (**self).remove(user, item)
    }
}

/// Process-local store, handy for tests and throwaway sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryRepository {
    states: HashMap<(UserId, ItemId), ReviewState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn for_user<'a>(&'a self, user: &'a UserId) -> impl Iterator<Item = &'a ReviewState> + 'a {
        self.states
            .iter()
            .filter(move |((owner, _), _)| owner == user)
            .map(|(_, state)| state)
    }
}

fn oldest_first(states: &mut [ReviewState]) {
    states.sort_by(|a, b| {
        a.next_review_at
            .cmp(&b.next_review_at)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
}

impl ReviewRepository for MemoryRepository {
    fn load(&self, user: &UserId, item: &ItemId) -> Result<Option<ReviewState>> {
        Ok(self.states.get(&(user.clone(), item.clone())).cloned())
    }

    fn save(&mut self, user: &UserId, state: &ReviewState) -> Result<()> {
        self.states
            .insert((user.clone(), state.item_id.clone()), state.clone());
        Ok(())
    }

    fn due(&self, user: &UserId, now: DateTime<Utc>) -> Result<Vec<ReviewState>> {
        let mut due: Vec<_> = self
            .for_user(user)
            .filter(|state| state.is_due(now))
            .cloned()
            .collect();
        oldest_first(&mut due);
        Ok(due)
    }

    fn all(&self, user: &UserId) -> Result<Vec<ReviewState>> {
        let mut states: Vec<_> = self.for_user(user).cloned().collect();
        oldest_first(&mut states);
        Ok(states)
    }

    fn remove(&mut self, user: &UserId, item: &ItemId) -> Result<bool> {
        Ok(self.states.remove(&(user.clone(), item.clone())).is_some())
    }
}
