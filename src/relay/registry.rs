//! Registry of connected clients

use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{ChatMessage, ServerEvent};

/// Opaque identifier assigned to every connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ConnectionEntry {
    sender: mpsc::Sender<ServerEvent>,
    history_sent: bool,
}

/// Outbound queues of every connected client, keyed by id
///
/// All sends use `try_send`: a client whose queue is full or already closed
/// is skipped and never holds up delivery to the others.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ConnectionId, sender: mpsc::Sender<ServerEvent>) {
        self.connections.insert(
            id,
            ConnectionEntry {
                sender,
                history_sent: false,
            },
        );
    }

    /// Remove a connection, returning whether it was registered
    pub fn remove(&mut self, id: &ConnectionId) -> bool {
        self.connections.remove(id).is_some()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Queue an event for every connection; returns how many accepted it
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        self.connections
            .iter()
            .filter(|(id, entry)| try_deliver(id, &entry.sender, event.clone()))
            .count()
    }

    /// Queue the history replay for one connection, at most once
    ///
    /// `snapshot` is only evaluated when the connection still needs its
    /// history. A full queue leaves the replay pending so it can be retried.
    pub fn deliver_history<F>(&mut self, id: &ConnectionId, snapshot: F) -> HistoryDelivery
    where
        F: FnOnce() -> Vec<ChatMessage>,
    {
        let Some(entry) = self.connections.get_mut(id) else {
            debug!(connection = %id, "History delivery skipped, connection closed");
            return HistoryDelivery::Unknown;
        };

        if entry.history_sent {
            return HistoryDelivery::AlreadySent;
        }

        match entry.sender.try_send(ServerEvent::ChatHistory(snapshot())) {
            Ok(()) => {
                entry.history_sent = true;
                HistoryDelivery::Sent
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(connection = %id, "Outbound buffer full, history replay deferred");
                HistoryDelivery::Deferred
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(connection = %id, "Outbound queue closed, history replay dropped");
                HistoryDelivery::Closed
            }
        }
    }
}

/// Outcome of a history replay attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDelivery {
    Sent,
    AlreadySent,
    /// Queue was full; the replay is still pending
    Deferred,
    /// Client stopped reading; it will be deregistered shortly
    Closed,
    Unknown,
}

fn try_deliver(id: &ConnectionId, sender: &mpsc::Sender<ServerEvent>, event: ServerEvent) -> bool {
    match sender.try_send(event) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(event)) => {
            debug!(connection = %id, event = event.name(), "Outbound buffer full, dropping event");
            false
        }
        Err(mpsc::error::TrySendError::Closed(event)) => {
            debug!(connection = %id, event = event.name(), "Outbound queue closed, dropping event");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(n: usize) -> Vec<ChatMessage> {
        (0..n).map(|i| ChatMessage::text_only(i.to_string())).collect()
    }

    #[test]
    fn test_connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn test_register_and_remove() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        let id = ConnectionId::new();

        registry.register(id, tx);
        assert!(registry.contains(&id));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_every_connection() {
        let mut registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        registry.register(ConnectionId::new(), tx_a);
        registry.register(ConnectionId::new(), tx_b);

        let event = ServerEvent::ReceiveMessage(ChatMessage::text_only("hi"));
        assert_eq!(registry.broadcast(&event), 2);

        assert_eq!(rx_a.try_recv().unwrap(), event);
        assert_eq!(rx_b.try_recv().unwrap(), event);
    }

    #[test]
    fn test_broadcast_skips_closed_and_full_queues() {
        let mut registry = ConnectionRegistry::new();

        let (tx_closed, rx_closed) = mpsc::channel(4);
        drop(rx_closed);
        registry.register(ConnectionId::new(), tx_closed);

        let (tx_full, _rx_full) = mpsc::channel(1);
        tx_full
            .try_send(ServerEvent::ChatHistory(Vec::new()))
            .unwrap();
        registry.register(ConnectionId::new(), tx_full);

        let (tx_ok, mut rx_ok) = mpsc::channel(4);
        registry.register(ConnectionId::new(), tx_ok);

        let event = ServerEvent::ReceiveMessage(ChatMessage::text_only("still delivered"));
        assert_eq!(registry.broadcast(&event), 1);
        assert_eq!(rx_ok.try_recv().unwrap(), event);
    }

    #[test]
    fn test_history_delivered_once() {
        let mut registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(4);
        let id = ConnectionId::new();
        registry.register(id, tx);

        assert_eq!(
            registry.deliver_history(&id, || history_of(2)),
            HistoryDelivery::Sent
        );
        assert_eq!(
            registry.deliver_history(&id, || panic!("snapshot taken twice")),
            HistoryDelivery::AlreadySent
        );

        assert_eq!(rx.try_recv().unwrap(), ServerEvent::ChatHistory(history_of(2)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_history_for_unknown_connection_is_noop() {
        let mut registry = ConnectionRegistry::new();
        assert_eq!(
            registry.deliver_history(&ConnectionId::new(), || history_of(1)),
            HistoryDelivery::Unknown
        );
    }

    #[test]
    fn test_history_stays_pending_while_queue_full() {
        let mut registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(1);
        let id = ConnectionId::new();
        registry.register(id, tx);

        let filler = ServerEvent::ReceiveMessage(ChatMessage::text_only("filler"));
        assert_eq!(registry.broadcast(&filler), 1);

        assert_eq!(
            registry.deliver_history(&id, || history_of(1)),
            HistoryDelivery::Deferred
        );

        assert_eq!(rx.try_recv().unwrap(), filler);
        assert_eq!(
            registry.deliver_history(&id, || history_of(1)),
            HistoryDelivery::Sent
        );
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::ChatHistory(history_of(1)));
    }

    #[test]
    fn test_history_to_closed_queue() {
        let mut registry = ConnectionRegistry::new();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let id = ConnectionId::new();
        registry.register(id, tx);

        assert_eq!(
            registry.deliver_history(&id, || history_of(1)),
            HistoryDelivery::Closed
        );
    }
}
