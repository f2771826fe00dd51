//! The relay task and its handle

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument};

use super::registry::{ConnectionId, ConnectionRegistry, HistoryDelivery};
use super::{COMMAND_BUFFER_SIZE, WS_BUFFER_SIZE};
use crate::config::RelayConfig;
use crate::error::{ChatError, Result};
use crate::history::HistoryBuffer;
use crate::models::{ChatMessage, ServerEvent};

/// Point-in-time relay counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub connections: usize,
    pub history: usize,
}

enum RelayCommand {
    Connect {
        sender: mpsc::Sender<ServerEvent>,
        reply: oneshot::Sender<ConnectionId>,
    },
    Ready {
        id: ConnectionId,
    },
    HistoryDue {
        id: ConnectionId,
    },
    Message {
        id: ConnectionId,
        message: ChatMessage,
    },
    Disconnect {
        id: ConnectionId,
    },
    Stats {
        reply: oneshot::Sender<RelayStats>,
    },
}

/// A registered connection as seen by its socket task
pub struct RelayConnection {
    pub id: ConnectionId,
    /// Events to write to this client, in order
    pub events: mpsc::Receiver<ServerEvent>,
}

/// Single-writer owner of the history buffer and connection registry
pub struct ChatRelay {
    history: HistoryBuffer,
    registry: ConnectionRegistry,
    history_delay: Duration,
    commands: mpsc::Receiver<RelayCommand>,
    /// Used by deferred history timers; weak so the relay still stops once
    /// every handle is dropped
    timer_tx: mpsc::WeakSender<RelayCommand>,
}

impl ChatRelay {
    /// Create a relay and the handle used to talk to it
    pub fn new(config: &RelayConfig) -> (Self, RelayHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER_SIZE);

        let relay = Self {
            history: HistoryBuffer::with_capacity(config.history_size),
            registry: ConnectionRegistry::new(),
            history_delay: config.history_delay,
            commands: rx,
            timer_tx: tx.downgrade(),
        };

        (relay, RelayHandle { commands: tx })
    }

    /// Run the relay (call in a spawned task)
    ///
    /// Stops when shutdown is signalled or every [`RelayHandle`] is dropped.
    #[instrument(skip(self, shutdown))]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting chat relay (history: {}, fallback delay: {:?})",
            self.history.capacity(),
            self.history_delay
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle(command),
                        None => {
                            debug!("All relay handles dropped");
                            break;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Chat relay shutting down");
                        break;
                    }
                }
            }
        }

        info!(
            "Chat relay stopped ({} connections, {} messages in history)",
            self.registry.len(),
            self.history.len()
        );
    }

    fn handle(&mut self, command: RelayCommand) {
        match command {
            RelayCommand::Connect { sender, reply } => {
                let id = ConnectionId::new();
                self.registry.register(id, sender);
                self.schedule_history(id);
                info!(connection = %id, "User connected ({} online)", self.registry.len());
                let _ = reply.send(id);
            }
            RelayCommand::Ready { id } => {
                debug!(connection = %id, "Client ready");
                self.deliver_history(id);
            }
            RelayCommand::HistoryDue { id } => {
                self.deliver_history(id);
            }
            RelayCommand::Message { id, message } => {
                debug!(
                    connection = %id,
                    text = message.text().unwrap_or_default(),
                    "Relaying message"
                );
                self.history.append(message.clone());
                let delivered = self.registry.broadcast(&ServerEvent::ReceiveMessage(message));
                debug!(
                    "Broadcast to {}/{} connections",
                    delivered,
                    self.registry.len()
                );
            }
            RelayCommand::Disconnect { id } => {
                if self.registry.remove(&id) {
                    info!(connection = %id, "User disconnected ({} online)", self.registry.len());
                }
            }
            RelayCommand::Stats { reply } => {
                let _ = reply.send(RelayStats {
                    connections: self.registry.len(),
                    history: self.history.len(),
                });
            }
        }
    }

    fn deliver_history(&mut self, id: ConnectionId) {
        let history = &self.history;
        match self.registry.deliver_history(&id, || history.snapshot()) {
            HistoryDelivery::Sent => {
                debug!(connection = %id, "Sent {} history messages", history.len());
            }
            // Retry once the client has had time to drain its queue
            HistoryDelivery::Deferred => self.schedule_history(id),
            HistoryDelivery::AlreadySent | HistoryDelivery::Closed | HistoryDelivery::Unknown => {}
        }
    }

    /// Fallback for clients that never send `client_ready`
    fn schedule_history(&self, id: ConnectionId) {
        let timer_tx = self.timer_tx.clone();
        let delay = self.history_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = timer_tx.upgrade() {
                let _ = tx.send(RelayCommand::HistoryDue { id }).await;
            }
        });
    }
}

/// Cloneable handle for talking to the [`ChatRelay`] task
#[derive(Clone)]
pub struct RelayHandle {
    commands: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// Register a new connection
    ///
    /// History is delivered on [`RelayHandle::ready`] or after the fallback
    /// delay, whichever comes first.
    pub async fn connect(&self) -> Result<RelayConnection> {
        let (sender, events) = mpsc::channel(WS_BUFFER_SIZE);
        let (reply, id) = oneshot::channel();

        self.send(RelayCommand::Connect { sender, reply }).await?;
        let id = id.await.map_err(|_| ChatError::RelayUnavailable)?;

        Ok(RelayConnection { id, events })
    }

    /// The client has attached its listeners
    pub async fn ready(&self, id: ConnectionId) -> Result<()> {
        self.send(RelayCommand::Ready { id }).await
    }

    /// Append a message to history and broadcast it to everyone, sender included
    pub async fn send_message(&self, id: ConnectionId, message: ChatMessage) -> Result<()> {
        self.send(RelayCommand::Message { id, message }).await
    }

    pub async fn disconnect(&self, id: ConnectionId) -> Result<()> {
        self.send(RelayCommand::Disconnect { id }).await
    }

    pub async fn stats(&self) -> Result<RelayStats> {
        let (reply, stats) = oneshot::channel();
        self.send(RelayCommand::Stats { reply }).await?;
        stats.await.map_err(|_| ChatError::RelayUnavailable)
    }

    async fn send(&self, command: RelayCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ChatError::RelayUnavailable)
    }
}
