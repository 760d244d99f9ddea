//! Room event channel.
//!
//! The transport and engine layers report what happened in the call over an
//! explicit bounded channel instead of callbacks attached to long-lived
//! objects. Delivery semantics: each event is delivered at most once, in
//! FIFO order per sender; the coordinator's watcher is the single consumer.

use tokio::sync::mpsc;

/// Channel capacity for room events.
const CHANNEL_CAPACITY: usize = 64;

/// Something observable happened in the shared call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A participant joined, carrying its identity string.
    ParticipantConnected { identity: String },
    /// The underlying session reported a terminal error.
    SessionError { message: String },
}

/// Create the room event channel.
///
/// Producers (transport watcher, engine stack) hold cloned senders; the
/// session coordinator consumes the receiver.
pub fn room_event_channel() -> (mpsc::Sender<RoomEvent>, mpsc::Receiver<RoomEvent>) {
    mpsc::channel(CHANNEL_CAPACITY)
}
