//! The bouncer-facing module: filters host events and feeds the pipeline.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::buffer_store::ConversationKey;
use crate::delivery::Deliver;
use crate::guard::{guarded, report_failure};
use crate::host::{BouncerContext, HookResult, ModuleHooks};
use crate::pipeline::{DeliveryPipeline, PipelineOptions};
use crate::settings::{load_settings, ConfigError, ModuleSettings};
use crate::settings_store::SettingsStore;

pub const MODULE_NAME: &str = "irssinotify";
pub const MODULE_DESCRIPTION: &str = "IrssiNotifier plugin for ZNC";
pub const WEB_MENU_TITLE: &str = "E-Mail on messages when away";

pub struct IrssiNotify<D: Deliver> {
    ctx: Arc<dyn BouncerContext>,
    store: Box<dyn SettingsStore + Send>,
    settings: Option<ModuleSettings>,
    pipeline: DeliveryPipeline<D>,
}

impl<D: Deliver> IrssiNotify<D> {
    pub fn new(
        ctx: Arc<dyn BouncerContext>,
        store: Box<dyn SettingsStore + Send>,
        deliverer: D,
        options: PipelineOptions,
    ) -> Self {
        Self {
            ctx,
            store,
            settings: None,
            pipeline: DeliveryPipeline::new(deliverer, options),
        }
    }

    pub fn description(&self) -> &'static str {
        MODULE_DESCRIPTION
    }

    /// True once a load succeeded.
    pub fn is_active(&self) -> bool {
        self.settings.is_some()
    }

    pub fn settings(&self) -> Option<&ModuleSettings> {
        self.settings.as_ref()
    }

    pub fn pipeline(&self) -> &DeliveryPipeline<D> {
        &self.pipeline
    }

    pub fn context(&self) -> &dyn BouncerContext {
        self.ctx.as_ref()
    }

    pub fn highlight(&self, message: &str) -> bool {
        let keywords = self
            .settings
            .as_ref()
            .map(ModuleSettings::keywords)
            .unwrap_or_default();
        is_highlight(message, &self.ctx.current_nick(), keywords)
    }
}

/// Case-sensitive substring match against the nick or any keyword. Empty
/// needles never match.
pub fn is_highlight(message: &str, nick: &str, keywords: &[String]) -> bool {
    std::iter::once(nick)
        .chain(keywords.iter().map(String::as_str))
        .filter(|needle| !needle.is_empty())
        .any(|needle| message.contains(needle))
}

fn load(
    ctx: &dyn BouncerContext,
    store: &mut dyn SettingsStore,
    args: &str,
) -> Result<ModuleSettings, ConfigError> {
    match load_settings(args, store, &ctx.user_nick()) {
        Ok(settings) => {
            ctx.put_module("irssinotify loaded successfully");
            info!("loaded with keywords {:?}", settings.keywords());
            Ok(settings)
        }
        Err(ConfigError::Missing(missing)) => {
            for setting in &missing {
                ctx.put_module(setting.hint());
            }
            Err(ConfigError::Missing(missing))
        }
        Err(err) => {
            report_failure(ctx, "on_load", &err);
            Err(err)
        }
    }
}

impl<D: Deliver> ModuleHooks for IrssiNotify<D> {
    fn on_load(&mut self, args: &str) -> Result<(), ConfigError> {
        let Self {
            ctx,
            store,
            settings,
            ..
        } = self;
        let ctx = ctx.as_ref();
        guarded(ctx, "on_load", Err(ConfigError::Aborted), || {
            let loaded = load(ctx, &mut **store, args);
            *settings = loaded.as_ref().ok().cloned();
            Ok(loaded.map(|_| ()))
        })
    }

    fn on_private_message(&mut self, sender: &str, text: &str) -> HookResult {
        let Self {
            ctx,
            settings,
            pipeline,
            ..
        } = self;
        let ctx = ctx.as_ref();
        guarded(ctx, "on_private_message", HookResult::Continue, || {
            if settings.is_none() {
                debug!("ignoring private message from {}: not loaded", sender);
                return Ok(HookResult::Continue);
            }
            pipeline.send(ctx, sender, None, text);
            Ok(HookResult::Continue)
        })
    }

    fn on_channel_message(&mut self, sender: &str, channel: &str, text: &str) -> HookResult {
        let Self {
            ctx,
            settings,
            pipeline,
            ..
        } = self;
        let ctx = ctx.as_ref();
        guarded(ctx, "on_channel_message", HookResult::Continue, || {
            let Some(settings) = settings.as_ref() else {
                debug!("ignoring message in {}: not loaded", channel);
                return Ok(HookResult::Continue);
            };
            if is_highlight(text, &ctx.current_nick(), settings.keywords()) {
                pipeline.send(ctx, sender, Some(channel), text);
            }
            Ok(HookResult::Continue)
        })
    }

    fn on_timer(&mut self, key: &ConversationKey) -> HookResult {
        let Self {
            ctx,
            settings,
            pipeline,
            ..
        } = self;
        let ctx = ctx.as_ref();
        guarded(ctx, "on_timer", HookResult::Continue, || {
            let Some(settings) = settings.as_ref() else {
                debug!("ignoring timer for {}: not loaded", key);
                return Ok(HookResult::Continue);
            };
            pipeline.fire(ctx, settings, key, Utc::now())?;
            Ok(HookResult::Continue)
        })
    }

    fn tick(&mut self, now: DateTime<Utc>) {
        let Self {
            ctx,
            settings,
            pipeline,
            ..
        } = self;
        let Some(settings) = settings.as_ref() else {
            return;
        };
        let ctx = ctx.as_ref();
        guarded(ctx, "tick", (), || {
            pipeline.tick(ctx, settings, now);
            Ok(())
        })
    }

    fn on_status_command(&mut self, command: &str) -> HookResult {
        let ctx = self.ctx.as_ref();
        guarded(ctx, "on_status_command", HookResult::Continue, || {
            ctx.put_module("TRACE: on_status_command");
            info!("STATUS: {}", command);
            Ok(HookResult::Continue)
        })
    }

    fn web_menu_title(&self) -> &'static str {
        WEB_MENU_TITLE
    }
}
