//! Bounded message history
//!
//! Keeps the most recent messages for replay to clients that join late.

use std::collections::VecDeque;

use crate::models::ChatMessage;

/// Default number of messages retained
pub const MAX_HISTORY: usize = 50;

/// FIFO buffer of the most recent chat messages
///
/// Appends go to the tail; once the buffer grows past its capacity the
/// oldest entry is dropped from the head. Reads never reorder entries.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer holding at most [`MAX_HISTORY`] messages
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    /// Create an empty buffer with a custom bound (at least one message)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a message, evicting the oldest one if the bound is exceeded
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// Ordered copy of the retained messages, oldest first
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(i: usize) -> ChatMessage {
        ChatMessage::from(json!({ "text": format!("message {}", i) }))
    }

    #[test]
    fn test_history_starts_empty() {
        let history = HistoryBuffer::new();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), MAX_HISTORY);
        assert!(history.snapshot().is_empty());
    }

    #[test]
    fn test_history_keeps_most_recent_in_order() {
        for n in [0, 1, 10, 49, 50, 51, 120] {
            let mut history = HistoryBuffer::new();
            for i in 0..n {
                history.append(msg(i));
            }

            let snapshot = history.snapshot();
            let expected: Vec<ChatMessage> = (n.saturating_sub(MAX_HISTORY)..n).map(msg).collect();
            assert_eq!(snapshot.len(), n.min(MAX_HISTORY));
            assert_eq!(snapshot, expected);
        }
    }

    #[test]
    fn test_history_evicts_first_after_overflow() {
        let mut history = HistoryBuffer::new();
        for i in 1..=50 {
            history.append(msg(i));
        }
        assert_eq!(history.snapshot()[0], msg(1));

        history.append(msg(51));

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 50);
        assert!(!snapshot.contains(&msg(1)));
        assert_eq!(snapshot[0], msg(2));
        assert_eq!(snapshot[49], msg(51));
    }

    #[test]
    fn test_history_snapshot_has_no_side_effect() {
        let mut history = HistoryBuffer::with_capacity(3);
        history.append(msg(1));
        history.append(msg(2));

        assert_eq!(history.snapshot(), history.snapshot());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_history_capacity_is_at_least_one() {
        let mut history = HistoryBuffer::with_capacity(0);
        assert_eq!(history.capacity(), 1);

        history.append(msg(1));
        history.append(msg(2));
        assert_eq!(history.snapshot(), vec![msg(2)]);
    }

    #[test]
    fn test_history_keeps_duplicates() {
        let mut history = HistoryBuffer::new();
        history.append(msg(7));
        history.append(msg(7));
        assert_eq!(history.len(), 2);
    }
}
