use serde::{Deserialize, Serialize};

/// Entity categories announced over the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    Ledger,
    Tournament,
    PaymentRequest,
    WithdrawalRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    Connected,
    Pong,
    Error {
        message: String,
    },
    /// A committed mutation touched the named entity. Clients re-fetch;
    /// the payload is a pointer, never authoritative state.
    EntityChanged {
        kind: EntityKind,
        id: String,
    },
}
