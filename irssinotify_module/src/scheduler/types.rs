use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::buffer_store::ConversationKey;

/// Quiet period between the first buffered message and delivery.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_secs(60);

/// A single-fire countdown for one conversation. The key is captured when the
/// timer is armed and never changes afterwards.
#[derive(Debug, Clone)]
pub struct PendingTimer {
    id: Uuid,
    key: ConversationKey,
    armed_at: DateTime<Utc>,
    run_at: DateTime<Utc>,
}

impl PendingTimer {
    pub(super) fn new(key: ConversationKey, armed_at: DateTime<Utc>, run_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            armed_at,
            run_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn armed_at(&self) -> DateTime<Utc> {
        self.armed_at
    }

    pub fn run_at(&self) -> DateTime<Utc> {
        self.run_at
    }

    pub(crate) fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.run_at <= now
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("timer already armed for {0}")]
    AlreadyArmed(ConversationKey),
    #[error("duration out of range")]
    DurationOutOfRange,
}
