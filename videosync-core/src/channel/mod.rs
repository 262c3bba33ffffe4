//! MQTT channel
//!
//! Connection configuration, topic naming, and the publishing and
//! subscribing roles that bridge the relay queue to the broker.

mod mqtt;

pub use mqtt::{Receiver, Sender};

use serde::{Deserialize, Serialize};

/// Namespace marker prefixed to the logical topic on the wire
const TOPIC_NAMESPACE: char = '$';

/// Broker connection parameters, supplied by the controlling application
/// from whatever settings store it owns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Client identifier, unique per broker
    pub client_id: String,
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Logical topic shared by both roles
    pub topic: String,
}

impl ChannelConfig {
    /// Topic the sender publishes to
    pub fn publish_topic(&self) -> String {
        format!("{}{}", TOPIC_NAMESPACE, self.topic)
    }

    /// Wildcard filter the receiver subscribes to, capturing every sender
    /// sub-topic
    pub fn subscribe_filter(&self) -> String {
        format!("{}{}/#", TOPIC_NAMESPACE, self.topic)
    }
}

/// Lifecycle of a channel role.
///
/// There is no reconnect-on-drop: a failed connection ends in
/// `Disconnected` and the controlling application constructs a fresh role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChannelConfig {
        ChannelConfig {
            client_id: "player-1".to_string(),
            host: "localhost".to_string(),
            port: 1883,
            topic: "movie-night".to_string(),
        }
    }

    #[test]
    fn test_publish_topic_carries_namespace_marker() {
        assert_eq!(config().publish_topic(), "$movie-night");
    }

    #[test]
    fn test_subscribe_filter_captures_sub_topics() {
        assert_eq!(config().subscribe_filter(), "$movie-night/#");
    }
}
