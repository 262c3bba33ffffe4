//! Transport events and their wire encoding
//!
//! One token per event; a publish payload is the token followed by a
//! trailing `,`. The receiver splits inbound payloads on `,` and skips
//! empty fragments, so a multi-token payload such as `d,P,1000,` decodes
//! the same way as three single-token publishes.

use crate::error::SyncError;

/// Token that instructs the receiver to discard its backlog
pub const CLEAR_TOKEN: &str = "d";

/// Separator between tokens on the wire
pub const TOKEN_SEPARATOR: char = ',';

/// One playback-control instruction or position heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// Discard any buffered events; always precedes a state-changing event
    ClearMarker,
    /// Start or resume playback
    Play,
    /// Pause playback
    Pause,
    /// Stop playback
    Stop,
    /// Seek to an absolute position in milliseconds
    SeekTo(i64),
    /// Double the playback rate
    RateUp,
    /// Halve the playback rate
    RateDown,
    /// Periodic absolute position while playing
    Heartbeat(i64),
}

impl TransportEvent {
    /// Wire token for this event
    pub fn encode(&self) -> String {
        match self {
            TransportEvent::ClearMarker => CLEAR_TOKEN.to_string(),
            TransportEvent::Play => "P".to_string(),
            TransportEvent::Pause => "p".to_string(),
            TransportEvent::Stop => "S".to_string(),
            TransportEvent::RateUp => ">".to_string(),
            TransportEvent::RateDown => "<".to_string(),
            TransportEvent::SeekTo(ms) | TransportEvent::Heartbeat(ms) => ms.to_string(),
        }
    }

    /// Publish payload for this event: the token plus the trailing separator
    pub fn encode_payload(&self) -> String {
        format!("{}{}", self.encode(), TOKEN_SEPARATOR)
    }

    /// Decode a single wire token.
    ///
    /// Integer tokens decode to [`TransportEvent::SeekTo`]: heartbeats and
    /// seek targets are indistinguishable on the wire and are applied
    /// through the same path.
    pub fn decode(token: &str) -> Result<Self, SyncError> {
        match token {
            CLEAR_TOKEN => Ok(TransportEvent::ClearMarker),
            "P" => Ok(TransportEvent::Play),
            "p" => Ok(TransportEvent::Pause),
            "S" => Ok(TransportEvent::Stop),
            ">" => Ok(TransportEvent::RateUp),
            "<" => Ok(TransportEvent::RateDown),
            _ => token
                .parse::<i64>()
                .map(TransportEvent::SeekTo)
                .map_err(|_| SyncError::MalformedToken(token.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_round_trip() {
        let commands = [
            TransportEvent::ClearMarker,
            TransportEvent::Play,
            TransportEvent::Pause,
            TransportEvent::Stop,
            TransportEvent::RateUp,
            TransportEvent::RateDown,
        ];
        for command in commands {
            let token = command.encode();
            assert_eq!(TransportEvent::decode(&token).unwrap(), command);
        }
    }

    #[test]
    fn test_time_tokens() {
        assert_eq!(TransportEvent::SeekTo(1000).encode(), "1000");
        assert_eq!(TransportEvent::Heartbeat(1000).encode(), "1000");
        // Frame-stepping back from near zero can go negative
        assert_eq!(
            TransportEvent::decode("-40").unwrap(),
            TransportEvent::SeekTo(-40)
        );
    }

    #[test]
    fn test_heartbeat_decodes_as_seek() {
        let token = TransportEvent::Heartbeat(42).encode();
        assert_eq!(
            TransportEvent::decode(&token).unwrap(),
            TransportEvent::SeekTo(42)
        );
    }

    #[test]
    fn test_payload_framing() {
        assert_eq!(TransportEvent::Play.encode_payload(), "P,");
        assert_eq!(TransportEvent::SeekTo(1000).encode_payload(), "1000,");
    }

    #[test]
    fn test_malformed_token() {
        let err = TransportEvent::decode("x7").unwrap_err();
        assert!(matches!(err, SyncError::MalformedToken(t) if t == "x7"));
    }
}
