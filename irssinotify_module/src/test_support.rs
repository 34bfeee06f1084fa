use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use encrypt_module::EncryptError;

use crate::buffer_store::ConversationKey;
use crate::delivery::{Conversation, Deliver, DeliveryError};
use crate::host::BouncerContext;
use crate::settings::ModuleSettings;

pub(crate) struct FakeContext {
    away: AtomicBool,
    nick: Mutex<String>,
    lines: Mutex<Vec<String>>,
}

impl FakeContext {
    pub(crate) fn away(nick: &str) -> Self {
        Self::new(nick, true)
    }

    pub(crate) fn present(nick: &str) -> Self {
        Self::new(nick, false)
    }

    fn new(nick: &str, away: bool) -> Self {
        Self {
            away: AtomicBool::new(away),
            nick: Mutex::new(nick.to_string()),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_away(&self, away: bool) {
        self.away.store(away, Ordering::SeqCst);
    }

    pub(crate) fn set_nick(&self, nick: &str) {
        *self.nick.lock().expect("nick lock") = nick.to_string();
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("lines lock").clone()
    }
}

impl BouncerContext for FakeContext {
    fn is_away(&self) -> bool {
        self.away.load(Ordering::SeqCst)
    }

    fn current_nick(&self) -> String {
        self.nick.lock().expect("nick lock").clone()
    }

    fn user_nick(&self) -> String {
        self.current_nick()
    }

    fn put_module(&self, line: &str) {
        self.lines.lock().expect("lines lock").push(line.to_string());
    }
}

/// Records every conversation handed to it. Clones share state.
#[derive(Clone, Default)]
pub(crate) struct RecordingDeliverer {
    deliveries: Arc<Mutex<Vec<(ConversationKey, String)>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    panicking: Arc<AtomicBool>,
}

impl RecordingDeliverer {
    pub(crate) fn failing() -> Self {
        let deliverer = Self::default();
        deliverer.set_failing(true);
        deliverer
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    pub(crate) fn deliveries(&self) -> Vec<(ConversationKey, String)> {
        self.deliveries.lock().expect("deliveries lock").clone()
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Deliver for RecordingDeliverer {
    fn deliver(
        &self,
        _settings: &ModuleSettings,
        conversation: &Conversation<'_>,
    ) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.panicking.load(Ordering::SeqCst) {
            panic!("deliverer exploded");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Encrypt(EncryptError::OpensslNotFound {
                binary: "openssl-missing".into(),
            }));
        }
        self.deliveries
            .lock()
            .expect("deliveries lock")
            .push((conversation.key.clone(), conversation.text.to_string()));
        Ok(())
    }
}
