use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::buffer_store::{BufferError, ConversationBufferStore, ConversationKey};
use crate::delivery::{Conversation, Deliver, DeliveryError};
use crate::guard::{guarded, report_failure};
use crate::host::BouncerContext;
use crate::scheduler::{DebounceScheduler, SchedulerError, DEBOUNCE_INTERVAL};
use crate::settings::ModuleSettings;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub debounce_interval: Duration,
    /// Extra attempts after a failed flush. Zero leaves a failed buffer in
    /// place with no timer.
    pub retry_limit: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            debounce_interval: DEBOUNCE_INTERVAL,
            retry_limit: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// What happened when a timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Delivered,
    /// The flush failed and a new timer was armed for the same conversation.
    Retrying { attempt: u32 },
    /// The flush failed and the buffer stays without a timer.
    Stuck,
    /// No timer was armed for the conversation.
    NotArmed,
}

pub struct DeliveryPipeline<D: Deliver> {
    buffers: ConversationBufferStore,
    scheduler: DebounceScheduler,
    deliverer: D,
    retry_limit: u32,
    failure_counts: HashMap<ConversationKey, u32>,
}

impl<D: Deliver> DeliveryPipeline<D> {
    pub fn new(deliverer: D, options: PipelineOptions) -> Self {
        Self {
            buffers: ConversationBufferStore::new(),
            scheduler: DebounceScheduler::new(options.debounce_interval),
            deliverer,
            retry_limit: options.retry_limit,
            failure_counts: HashMap::new(),
        }
    }

    pub fn buffers(&self) -> &ConversationBufferStore {
        &self.buffers
    }

    pub fn scheduler(&self) -> &DebounceScheduler {
        &self.scheduler
    }

    pub fn deliverer(&self) -> &D {
        &self.deliverer
    }

    /// Buffers `message` when the user is away, arming a timer for a new
    /// conversation. Returns whether the message was buffered; failures are
    /// reported on the module channel and come back as `false`.
    pub fn send(
        &mut self,
        ctx: &dyn BouncerContext,
        sender: &str,
        destination: Option<&str>,
        message: &str,
    ) -> bool {
        guarded(ctx, "send", false, || {
            Ok(self.try_send(ctx, sender, destination, message, Utc::now())?)
        })
    }

    fn try_send(
        &mut self,
        ctx: &dyn BouncerContext,
        sender: &str,
        destination: Option<&str>,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, PipelineError> {
        if !should_send(ctx) {
            return Ok(false);
        }

        let key = ConversationKey::new(sender, destination.map(str::to_string));
        if !self.buffers.exists(&key) {
            // Buffer and timer exist together or not at all.
            let run_at = self.scheduler.arm(key.clone(), now)?.run_at();
            if let Err(err) = self.buffers.create(key.clone()) {
                self.scheduler.take(&key);
                return Err(err.into());
            }
            debug!("new conversation {} flushes at {}", key, run_at);
        }
        self.buffers.append(&key, message)?;
        Ok(true)
    }

    /// Delivers the buffered text for `key`. The buffer is left untouched.
    pub fn flush(&self, settings: &ModuleSettings, key: &ConversationKey) -> Result<(), DeliveryError> {
        let buffer = match self.buffers.get(key) {
            Some(buffer) if !buffer.is_empty() => buffer,
            _ => return Err(DeliveryError::EmptyBuffer(key.clone())),
        };
        self.deliverer.deliver(
            settings,
            &Conversation {
                key,
                text: buffer.text(),
            },
        )
    }

    /// Consumes the timer for `key`, flushes, and clears the buffer on success.
    pub fn fire(
        &mut self,
        ctx: &dyn BouncerContext,
        settings: &ModuleSettings,
        key: &ConversationKey,
        now: DateTime<Utc>,
    ) -> Result<FireOutcome, PipelineError> {
        let Some(timer) = self.scheduler.take(key) else {
            debug!("ignoring fire for {}: no armed timer", key);
            return Ok(FireOutcome::NotArmed);
        };
        debug!("timer {} fired for {}", timer.id(), key);

        match self.flush(settings, key) {
            Ok(()) => {
                ctx.put_module("clearing buffer");
                let buffer = self.buffers.clear(key)?;
                self.failure_counts.remove(key);
                ctx.put_module("Notification sent");
                info!(
                    "sent {} buffered message(s) for {}",
                    buffer.message_count(),
                    key
                );
                Ok(FireOutcome::Delivered)
            }
            Err(err) => {
                let retryable = !matches!(err, DeliveryError::EmptyBuffer(_));
                if !retryable {
                    ctx.put_module("Something is wrong, no message");
                }
                report_failure(ctx, "flush", &err);
                if retryable {
                    self.handle_failed_flush(key, now)
                } else {
                    Ok(FireOutcome::Stuck)
                }
            }
        }
    }

    fn handle_failed_flush(
        &mut self,
        key: &ConversationKey,
        now: DateTime<Utc>,
    ) -> Result<FireOutcome, PipelineError> {
        let failures = self.failure_counts.entry(key.clone()).or_insert(0);
        *failures += 1;
        let attempt = *failures;
        if attempt <= self.retry_limit {
            self.scheduler.arm(key.clone(), now)?;
            warn!(
                "delivery for {} failed; retry {} of {} armed",
                key, attempt, self.retry_limit
            );
            return Ok(FireOutcome::Retrying { attempt });
        }

        self.failure_counts.remove(key);
        // No timer is left for this key, and later messages only append.
        warn!(
            "delivery for {} failed; buffer of {} message(s) left without a timer",
            key,
            self.buffers
                .get(key)
                .map(|buffer| buffer.message_count())
                .unwrap_or(0)
        );
        Ok(FireOutcome::Stuck)
    }

    /// Fires every timer due at `now`, in arming order.
    pub fn tick(
        &mut self,
        ctx: &dyn BouncerContext,
        settings: &ModuleSettings,
        now: DateTime<Utc>,
    ) -> Vec<(ConversationKey, FireOutcome)> {
        let mut outcomes = Vec::new();
        for key in self.scheduler.due(now) {
            match self.fire(ctx, settings, &key, now) {
                Ok(outcome) => outcomes.push((key, outcome)),
                Err(err) => report_failure(ctx, "tick", &err),
            }
        }
        outcomes
    }
}

fn should_send(ctx: &dyn BouncerContext) -> bool {
    if !ctx.is_away() {
        ctx.put_module("Not sending because not away");
        debug!("not buffering message: user is not away");
        return false;
    }
    true
}
