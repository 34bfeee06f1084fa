//! Pending message text per conversation.
//!
//! A buffer is created by the first qualifying message of a conversation and
//! lives until the delivery pipeline clears it after a successful send.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

/// One sender plus an optional destination channel. No destination means a
/// private conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    sender: String,
    destination: Option<String>,
}

impl ConversationKey {
    pub fn new(sender: impl Into<String>, destination: Option<String>) -> Self {
        Self {
            sender: sender.into(),
            destination,
        }
    }

    pub fn private(sender: impl Into<String>) -> Self {
        Self::new(sender, None)
    }

    pub fn channel(sender: impl Into<String>, channel: impl Into<String>) -> Self {
        Self::new(sender, Some(channel.into()))
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn is_private(&self) -> bool {
        self.destination.is_none()
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.destination {
            Some(destination) => write!(f, "{}:{}", self.sender, destination),
            None => write!(f, "{}:(private)", self.sender),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    text: String,
    message_count: usize,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConversationBuffer {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            text: String::new(),
            message_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn push(&mut self, message: &str, now: DateTime<Utc>) {
        if self.message_count > 0 {
            self.text.push('\n');
        }
        self.text.push_str(message);
        self.message_count += 1;
        self.updated_at = now;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn message_count(&self) -> usize {
        self.message_count
    }

    /// True until the first message lands, even if that message is blank.
    pub fn is_empty(&self) -> bool {
        self.message_count == 0
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("buffer already exists for {0}")]
    AlreadyExists(ConversationKey),
    #[error("no buffer for {0}")]
    Missing(ConversationKey),
}

#[derive(Debug, Default)]
pub struct ConversationBufferStore {
    buffers: HashMap<ConversationKey, ConversationBuffer>,
}

impl ConversationBufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, key: &ConversationKey) -> bool {
        self.buffers.contains_key(key)
    }

    pub fn create(&mut self, key: ConversationKey) -> Result<(), BufferError> {
        if self.buffers.contains_key(&key) {
            return Err(BufferError::AlreadyExists(key));
        }
        self.buffers.insert(key, ConversationBuffer::new(Utc::now()));
        Ok(())
    }

    pub fn append(&mut self, key: &ConversationKey, message: &str) -> Result<(), BufferError> {
        let buffer = self
            .buffers
            .get_mut(key)
            .ok_or_else(|| BufferError::Missing(key.clone()))?;
        buffer.push(message, Utc::now());
        Ok(())
    }

    pub fn read(&self, key: &ConversationKey) -> Option<&str> {
        self.buffers.get(key).map(ConversationBuffer::text)
    }

    pub fn get(&self, key: &ConversationKey) -> Option<&ConversationBuffer> {
        self.buffers.get(key)
    }

    pub fn clear(&mut self, key: &ConversationKey) -> Result<ConversationBuffer, BufferError> {
        self.buffers
            .remove(key)
            .ok_or_else(|| BufferError::Missing(key.clone()))
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ConversationKey> {
        self.buffers.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_joins_messages_with_line_breaks() {
        let mut store = ConversationBufferStore::new();
        let key = ConversationKey::channel("alice", "#rust");
        store.create(key.clone()).expect("create");
        store.append(&key, "first").expect("append first");
        store.append(&key, "second").expect("append second");
        store.append(&key, "third").expect("append third");

        assert_eq!(store.read(&key), Some("first\nsecond\nthird"));
        assert_eq!(store.get(&key).expect("buffer").message_count(), 3);
    }

    #[test]
    fn create_twice_is_rejected() {
        let mut store = ConversationBufferStore::new();
        let key = ConversationKey::private("alice");
        store.create(key.clone()).expect("create");
        let err = store.create(key.clone()).expect_err("second create");
        assert!(matches!(err, BufferError::AlreadyExists(existing) if existing == key));
    }

    #[test]
    fn append_and_clear_require_a_buffer() {
        let mut store = ConversationBufferStore::new();
        let key = ConversationKey::private("alice");
        assert!(matches!(
            store.append(&key, "hi"),
            Err(BufferError::Missing(_))
        ));
        assert!(matches!(store.clear(&key), Err(BufferError::Missing(_))));
        assert_eq!(store.read(&key), None);
    }

    #[test]
    fn clear_removes_only_that_conversation() {
        let mut store = ConversationBufferStore::new();
        let private = ConversationKey::private("alice");
        let channel = ConversationKey::channel("alice", "#rust");
        store.create(private.clone()).expect("create private");
        store.create(channel.clone()).expect("create channel");
        store.append(&private, "psst").expect("append private");
        store.append(&channel, "hey bob").expect("append channel");

        let cleared = store.clear(&private).expect("clear");
        assert_eq!(cleared.text(), "psst");
        assert!(!store.exists(&private));
        assert_eq!(store.read(&channel), Some("hey bob"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn blank_message_still_counts() {
        let mut store = ConversationBufferStore::new();
        let key = ConversationKey::private("alice");
        store.create(key.clone()).expect("create");
        assert!(store.get(&key).expect("buffer").is_empty());
        store.append(&key, "").expect("append");
        let buffer = store.get(&key).expect("buffer");
        assert!(!buffer.is_empty());
        assert_eq!(buffer.text(), "");
    }

    #[test]
    fn key_display_marks_private_conversations() {
        assert_eq!(ConversationKey::private("alice").to_string(), "alice:(private)");
        assert_eq!(
            ConversationKey::channel("alice", "#rust").to_string(),
            "alice:#rust"
        );
    }
}
