use crate::{
    auth::JwtManager,
    constants::BROADCAST_CHANNEL_CAPACITY,
    ws::messages::{EntityKind, ServerMessage},
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Fan-out hub for the realtime change feed.
///
/// Every connected client receives every `EntityChanged` event. Delivery is
/// at-least-once at best; the database remains the authoritative state and
/// clients re-fetch whatever an event points at.
pub struct EventHub {
    pub(super) jwt_manager: Arc<JwtManager>,
    changes: broadcast::Sender<ServerMessage>,
}

impl EventHub {
    pub fn new(jwt_manager: Arc<JwtManager>) -> Self {
        let (tx, _rx) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);
        Self {
            jwt_manager,
            changes: tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.changes.subscribe()
    }

    /// Publish a change notification. Send errors mean no subscribers
    /// are connected, which is not a failure.
    pub fn publish(&self, kind: EntityKind, id: &str) {
        let _ = self.changes.send(ServerMessage::EntityChanged {
            kind,
            id: id.to_string(),
        });
    }
}
