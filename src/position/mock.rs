//! Scripted GPS receiver for tests and development

use crate::position::{GpsError, GpsReceiver, GpsResult, ReceiverState};
use std::collections::VecDeque;

/// GPS receiver that replays queued decoder states, one per poll
#[derive(Debug, Default)]
pub struct MockGpsReceiver {
    pending: VecDeque<ReceiverState>,
    current: ReceiverState,
    fail_next: bool,
}

impl MockGpsReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a state to be "decoded" on a later poll
    pub fn push_state(&mut self, state: ReceiverState) {
        self.pending.push_back(state);
    }

    /// Make the next poll report a link error
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl GpsReceiver for MockGpsReceiver {
    fn process_pending(&mut self) -> GpsResult<bool> {
        if self.fail_next {
            self.fail_next = false;
            return Err(GpsError::Link {
                details: "simulated UART failure".to_string(),
            });
        }

        match self.pending.pop_front() {
            Some(state) => {
                self.current = state;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn state(&self) -> &ReceiverState {
        &self.current
    }
}
