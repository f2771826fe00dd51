//! Connection management and message fan-out
//!
//! A single [`ChatRelay`] task owns the history buffer and the set of
//! connected clients. Connection tasks talk to it through a cloneable
//! [`RelayHandle`], so appending a message and broadcasting it happen as one
//! step relative to every other connect, disconnect or message.

pub mod hub;
pub mod registry;

pub use hub::{ChatRelay, RelayConnection, RelayHandle, RelayStats};
pub use registry::{ConnectionId, ConnectionRegistry, HistoryDelivery};

/// Maximum number of events buffered per connection before new ones are dropped
pub const WS_BUFFER_SIZE: usize = 256;

/// Capacity of the command channel feeding the relay task
pub const COMMAND_BUFFER_SIZE: usize = 1024;
