pub mod buffer_store;
pub mod config;
pub mod delivery;
pub mod event_loop;
pub mod host;
pub mod module;
pub mod pipeline;
pub mod settings;
pub mod settings_store;

mod guard;
mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use buffer_store::{BufferError, ConversationBuffer, ConversationBufferStore, ConversationKey};
pub use delivery::{Conversation, Deliver, DeliveryError, RelayDeliverer, PRIVATE_CHANNEL_MARKER};
pub use host::{BouncerContext, HookResult, ModuleHooks};
pub use module::{IrssiNotify, MODULE_DESCRIPTION, MODULE_NAME, WEB_MENU_TITLE};
pub use pipeline::{DeliveryPipeline, FireOutcome, PipelineError, PipelineOptions};
pub use scheduler::{DebounceScheduler, PendingTimer, SchedulerError, DEBOUNCE_INTERVAL};
pub use settings::{ConfigError, MissingSetting, ModuleSettings};
