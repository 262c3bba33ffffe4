//! MQTT Sync Player - Core Library
//!
//! Relays transport-control events (play/pause/stop/seek/rate-change/
//! frame-step) and periodic position heartbeats between two video player
//! instances over an MQTT topic, so a client instance mirrors the
//! transport state of a server instance.

pub mod channel;
pub mod error;
pub mod event;
pub mod player;
pub mod queue;
pub mod session;

// Re-exports for convenience
pub use channel::{ChannelConfig, ConnectionState, Receiver, Sender};
pub use error::SyncError;
pub use event::TransportEvent;
pub use player::PlayerFacade;
pub use queue::RelayQueue;
pub use session::{ReceiverSession, SenderSession, StepDirection};
