//! Single-threaded host harness for running the module outside a bouncer.
//!
//! Producers push [`HostEvent`]s into a bounded channel; the loop applies them
//! to the module one at a time and polls the debounce timers between events.

use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::buffer_store::ConversationKey;
use crate::delivery::Deliver;
use crate::host::{BouncerContext, ModuleHooks};
use crate::module::{IrssiNotify, MODULE_NAME};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    PrivateMessage {
        sender: String,
        text: String,
    },
    ChannelMessage {
        sender: String,
        channel: String,
        text: String,
    },
    Away {
        away: bool,
    },
    Nick {
        nick: String,
    },
    Status {
        command: String,
    },
    /// A timer fire reported by a host that keeps its own clock.
    Timer {
        sender: String,
        #[serde(default)]
        channel: Option<String>,
    },
    Shutdown,
}

/// Away flag and nicknames of the simulated network session.
#[derive(Debug)]
pub struct SessionState {
    away: AtomicBool,
    nick: Mutex<String>,
    user_nick: String,
}

impl SessionState {
    pub fn new(user_nick: impl Into<String>, away: bool) -> Self {
        let user_nick = user_nick.into();
        Self {
            away: AtomicBool::new(away),
            nick: Mutex::new(user_nick.clone()),
            user_nick,
        }
    }

    pub fn set_away(&self, away: bool) {
        self.away.store(away, Ordering::SeqCst);
    }

    pub fn set_nick(&self, nick: &str) {
        if let Ok(mut current) = self.nick.lock() {
            *current = nick.to_string();
        }
    }
}

impl BouncerContext for SessionState {
    fn is_away(&self) -> bool {
        self.away.load(Ordering::SeqCst)
    }

    fn current_nick(&self) -> String {
        self.nick
            .lock()
            .map(|nick| nick.clone())
            .unwrap_or_else(|_| self.user_nick.clone())
    }

    fn user_nick(&self) -> String {
        self.user_nick.clone()
    }

    fn put_module(&self, line: &str) {
        info!("[*{}] {}", MODULE_NAME, line);
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A `shutdown` event arrived; pending timers were dropped.
    Shutdown,
    /// Every producer hung up; pending timers were run to completion.
    Disconnected,
}

pub struct EventLoop<D: Deliver> {
    module: IrssiNotify<D>,
    session: Arc<SessionState>,
    receiver: Receiver<HostEvent>,
    poll_interval: Duration,
}

impl<D: Deliver> EventLoop<D> {
    pub fn new(
        module: IrssiNotify<D>,
        session: Arc<SessionState>,
        receiver: Receiver<HostEvent>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            module,
            session,
            receiver,
            poll_interval,
        }
    }

    pub fn module(&self) -> &IrssiNotify<D> {
        &self.module
    }

    pub fn into_module(self) -> IrssiNotify<D> {
        self.module
    }

    pub fn run(&mut self) -> LoopExit {
        loop {
            match self.receiver.recv_timeout(self.poll_interval) {
                Ok(HostEvent::Shutdown) => {
                    info!("shutdown requested");
                    return LoopExit::Shutdown;
                }
                Ok(event) => self.dispatch(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.drain_timers();
                    return LoopExit::Disconnected;
                }
            }
            self.module.tick(Utc::now());
        }
    }

    fn dispatch(&mut self, event: HostEvent) {
        debug!("host event: {:?}", event);
        match event {
            HostEvent::PrivateMessage { sender, text } => {
                self.module.on_private_message(&sender, &text);
            }
            HostEvent::ChannelMessage {
                sender,
                channel,
                text,
            } => {
                self.module.on_channel_message(&sender, &channel, &text);
            }
            HostEvent::Away { away } => self.session.set_away(away),
            HostEvent::Nick { nick } => self.session.set_nick(&nick),
            HostEvent::Status { command } => {
                self.module.on_status_command(&command);
            }
            HostEvent::Timer { sender, channel } => {
                self.module.on_timer(&ConversationKey::new(sender, channel));
            }
            HostEvent::Shutdown => {}
        }
    }

    /// Sleeps until each armed timer is due and fires it.
    fn drain_timers(&mut self) {
        loop {
            if !self.module.is_active() {
                let pending = self.module.pipeline().scheduler().len();
                if pending > 0 {
                    warn!("module inactive; dropping {} pending timer(s)", pending);
                }
                return;
            }
            let next = self
                .module
                .pipeline()
                .scheduler()
                .timers()
                .iter()
                .map(|timer| timer.run_at())
                .min();
            let Some(run_at) = next else {
                return;
            };
            let wait = (run_at - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(self.poll_interval);
            if !wait.is_zero() {
                debug!("waiting {:?} for pending timers", wait);
                std::thread::sleep(wait);
            }
            self.module.tick(Utc::now());
        }
    }
}

/// Forwards newline-delimited JSON events until the input ends or the loop
/// goes away. Lines that do not parse are skipped. Returns the number of
/// events forwarded.
pub fn read_events<R: BufRead>(reader: R, sender: Sender<HostEvent>) -> std::io::Result<usize> {
    let mut forwarded = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = match serde_json::from_str::<HostEvent>(line) {
            Ok(event) => event,
            Err(err) => {
                warn!("skipping event on line {}: {}", index + 1, err);
                continue;
            }
        };
        let shutdown = event == HostEvent::Shutdown;
        if sender.send(event).is_err() {
            debug!("event loop stopped; no longer reading input");
            break;
        }
        forwarded += 1;
        if shutdown {
            break;
        }
    }
    Ok(forwarded)
}
