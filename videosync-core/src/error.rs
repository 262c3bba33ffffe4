//! Error types for the sync relay

/// Errors surfaced by the relay core
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The MQTT client rejected a request (publish, subscribe, disconnect)
    #[error("channel request failed: {0}")]
    Channel(#[from] rumqttc::ClientError),

    /// Connection-level failure while talking to the broker
    #[error("channel connection failed: {0}")]
    Connection(String),

    /// An inbound token that is neither a known command nor an integer time
    #[error("malformed token in stream: {0:?}")]
    MalformedToken(String),
}
