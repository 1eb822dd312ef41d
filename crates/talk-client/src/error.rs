//! Error taxonomy for the talk client.

use thiserror::Error;

/// Failures arising inside a voice session.
///
/// Only `Connection` is fatal to the session. The other classes are local to
/// a single inbound message: the dispatcher logs them and keeps receiving.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport could not be opened, or a send/receive on it failed.
    #[error("connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),
    /// An inbound message could not be understood.
    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
    /// The server reported an explicit error message.
    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },
    /// An audio payload could not be decoded.
    #[error("audio decode error: {0}")]
    Decode(String),
}
