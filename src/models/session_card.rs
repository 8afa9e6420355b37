//! Wrapper for review states that tracks progress inside one session.
use super::ReviewState;

#[derive(Clone, Debug)]
pub struct SessionCard {
    pub state: ReviewState,
    pub passed: bool,
}

impl SessionCard {
    pub fn new(state: ReviewState) -> Self {
        Self {
            state,
            passed: false,
        }
    }

    pub fn mark_as_passed(&mut self) {
        self.passed = true;
    }
}
