//! Message history — bounded, newest-first record of a channel's chat.
//!
//! Two views are kept: the whole channel and each user. Both are ordered
//! most-recent-first, so "the last N messages" is simply the first N.
//! A user's view is dropped once none of their messages remain in the
//! channel view, so at most `capacity` users are tracked at a time.
//! Snapshots are point-in-time copies and never observe later appends.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use oxiguard_core::{ChatMessage, ChatUser, ErrorKind};
use thiserror::Error;
use tracing::trace;

/// Default number of messages retained per view.
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Error)]
pub enum HistoryError {
    /// A previous writer panicked while holding the history lock.
    #[error("message history is poisoned")]
    Poisoned,
    /// The backing store refused the message.
    #[error("message rejected by store: {0}")]
    Rejected(String),
}

impl HistoryError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::StoreFault
    }
}

// ─────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────

/// Immutable, newest-first list of messages.
#[derive(Clone, Debug, Default)]
pub struct MessageSnapshot {
    messages: Vec<Arc<ChatMessage>>,
}

impl MessageSnapshot {
    fn from_deque(deque: &VecDeque<Arc<ChatMessage>>) -> Self {
        Self {
            messages: deque.iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Message at `index`, where 0 is the newest.
    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index).map(Arc::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().map(Arc::as_ref)
    }

    /// The `n` newest messages.
    pub fn take(&self, n: usize) -> MessageSnapshot {
        MessageSnapshot {
            messages: self.messages.iter().take(n).cloned().collect(),
        }
    }
}

// ─────────────────────────────────────────────
// Store trait
// ─────────────────────────────────────────────

/// Storage contract for channel message history.
pub trait MessageStore: Send + Sync {
    /// Record a message, returning the stored copy (with its sequence number).
    fn append(&self, message: ChatMessage) -> Result<Arc<ChatMessage>, HistoryError>;

    /// Snapshot of the whole channel, newest first.
    fn channel_snapshot(&self) -> MessageSnapshot;

    /// Snapshot of one user's messages, newest first.
    fn user_snapshot(&self, user: &ChatUser) -> MessageSnapshot;
}

// ─────────────────────────────────────────────
// In-memory history
// ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct HistoryState {
    next_sequence: u64,
    channel: VecDeque<Arc<ChatMessage>>,
    users: HashMap<ChatUser, VecDeque<Arc<ChatMessage>>>,
}

/// In-memory `MessageStore`; evicts the oldest message once a view is full.
#[derive(Debug)]
pub struct MessageHistory {
    capacity: usize,
    state: RwLock<HistoryState>,
}

impl MessageHistory {
    /// Create a history keeping at most `capacity` messages per view
    /// (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: RwLock::new(HistoryState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn push_bounded(deque: &mut VecDeque<Arc<ChatMessage>>, message: Arc<ChatMessage>, capacity: usize) {
    deque.push_front(message);
    deque.truncate(capacity);
}

impl MessageStore for MessageHistory {
    fn append(&self, mut message: ChatMessage) -> Result<Arc<ChatMessage>, HistoryError> {
        let mut state = self.state.write().map_err(|_| HistoryError::Poisoned)?;

        state.next_sequence += 1;
        message.sequence = state.next_sequence;
        let stored = Arc::new(message);

        let capacity = self.capacity;
        push_bounded(&mut state.channel, stored.clone(), capacity);
        let user_log = state.users.entry(stored.author.clone()).or_default();
        push_bounded(user_log, stored.clone(), capacity);

        if let Some(oldest) = state.channel.back().map(|m| m.sequence) {
            state
                .users
                .retain(|_, log| log.front().is_some_and(|m| m.sequence >= oldest));
        }

        trace!(user = %stored.author, sequence = stored.sequence, "message stored");
        Ok(stored)
    }

    fn channel_snapshot(&self) -> MessageSnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        MessageSnapshot::from_deque(&state.channel)
    }

    fn user_snapshot(&self, user: &ChatUser) -> MessageSnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .users
            .get(user)
            .map(MessageSnapshot::from_deque)
            .unwrap_or_default()
    }
}
