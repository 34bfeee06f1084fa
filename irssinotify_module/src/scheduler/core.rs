use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

use crate::buffer_store::ConversationKey;

use super::types::{PendingTimer, SchedulerError, DEBOUNCE_INTERVAL};

/// Registry of armed one-shot timers, at most one per conversation.
///
/// Timers are never cancelled or rearmed in place: firing removes the timer and
/// the caller decides whether a fresh one is needed.
#[derive(Debug)]
pub struct DebounceScheduler {
    interval: Duration,
    timers: Vec<PendingTimer>,
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new(DEBOUNCE_INTERVAL)
    }
}

impl DebounceScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timers: Vec::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timers(&self) -> &[PendingTimer] {
        &self.timers
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn is_armed(&self, key: &ConversationKey) -> bool {
        self.timers.iter().any(|timer| timer.key() == key)
    }

    pub fn get(&self, key: &ConversationKey) -> Option<&PendingTimer> {
        self.timers.iter().find(|timer| timer.key() == key)
    }

    pub fn arm(
        &mut self,
        key: ConversationKey,
        now: DateTime<Utc>,
    ) -> Result<&PendingTimer, SchedulerError> {
        if self.is_armed(&key) {
            return Err(SchedulerError::AlreadyArmed(key));
        }
        let delay = chrono::Duration::from_std(self.interval)
            .map_err(|_| SchedulerError::DurationOutOfRange)?;
        let run_at = now
            .checked_add_signed(delay)
            .ok_or(SchedulerError::DurationOutOfRange)?;

        let timer = PendingTimer::new(key, now, run_at);
        debug!(
            "armed timer {} for {} at {}",
            timer.id(),
            timer.key(),
            timer.run_at().to_rfc3339()
        );
        self.timers.push(timer);
        Ok(&self.timers[self.timers.len() - 1])
    }

    /// Removes and returns the timer for `key`; a removed timer never fires again.
    pub fn take(&mut self, key: &ConversationKey) -> Option<PendingTimer> {
        let index = self.timers.iter().position(|timer| timer.key() == key)?;
        Some(self.timers.remove(index))
    }

    /// Keys whose timers are due at `now`, in arming order.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<ConversationKey> {
        self.timers
            .iter()
            .filter(|timer| timer.is_due(now))
            .map(|timer| timer.key().clone())
            .collect()
    }
}
