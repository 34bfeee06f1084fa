mod core;
mod types;

pub use self::core::DebounceScheduler;
pub use types::{PendingTimer, SchedulerError, DEBOUNCE_INTERVAL};
