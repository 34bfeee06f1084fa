//! Seams between the module and the bouncer that embeds it.

use chrono::{DateTime, Utc};

use crate::buffer_store::ConversationKey;
use crate::settings::ConfigError;

/// Services the bouncer exposes to the module.
pub trait BouncerContext: Send + Sync {
    /// Whether the user's network session is marked away.
    fn is_away(&self) -> bool;
    /// The nickname currently in use on the network.
    fn current_nick(&self) -> String;
    /// The nickname configured for the bouncer user.
    fn user_nick(&self) -> String;
    /// Writes one line to the operator-visible module channel.
    fn put_module(&self, line: &str);
}

/// What the host should do with an event after the module saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResult {
    /// Let the host and other modules keep processing the event.
    Continue,
    /// Stop the host from processing the event any further.
    Halt,
}

/// Callbacks the bouncer delivers to the module, one per event kind. The host
/// calls them one at a time.
pub trait ModuleHooks {
    fn on_load(&mut self, args: &str) -> Result<(), ConfigError>;
    fn on_private_message(&mut self, sender: &str, text: &str) -> HookResult;
    fn on_channel_message(&mut self, sender: &str, channel: &str, text: &str) -> HookResult;
    /// A timer armed for `key` expired on the host's own clock.
    fn on_timer(&mut self, key: &ConversationKey) -> HookResult;
    /// Fires every timer due at `now`, for hosts that poll instead.
    fn tick(&mut self, now: DateTime<Utc>);
    fn on_status_command(&mut self, command: &str) -> HookResult;
    fn web_menu_title(&self) -> &'static str;
}
