//! Receiver-side session
//!
//! Buffers raw inbound tokens and applies at most one per tick to the
//! local player. Decoding is deferred to apply time so a clear marker can
//! discard undecoded entries atomically.

use std::sync::Arc;

use tracing::debug;

use crate::error::SyncError;
use crate::event::{TransportEvent, CLEAR_TOKEN, TOKEN_SEPARATOR};
use crate::player::PlayerFacade;
use crate::queue::RelayQueue;

/// Offset change applied per adjustment step, in milliseconds
pub const OFFSET_STEP_MS: i64 = 200;

/// Split an inbound payload into tokens and buffer them.
///
/// A clear token discards the whole backlog before later tokens in the
/// same payload are buffered, which is what gives the stream its
/// latest-wins semantics.
pub fn ingest_payload(backlog: &RelayQueue<String>, payload: &[u8]) {
    let text = String::from_utf8_lossy(payload);
    for token in text.split(TOKEN_SEPARATOR) {
        if token.is_empty() {
            continue;
        }
        if token == CLEAR_TOKEN {
            backlog.clear();
        } else {
            backlog.push(token.to_string());
        }
    }
}

/// Receiver-side session state.
///
/// Owns the token backlog fed by the channel receiver and a local offset
/// added to every inbound position, letting the operator compensate for
/// channel delay.
pub struct ReceiverSession {
    player: Arc<dyn PlayerFacade>,
    backlog: RelayQueue<String>,
    offset_ms: i64,
}

impl ReceiverSession {
    pub fn new(player: Arc<dyn PlayerFacade>) -> Self {
        Self {
            player,
            backlog: RelayQueue::new(),
            offset_ms: 0,
        }
    }

    /// Backlog handle for the channel receiver to feed
    pub fn backlog(&self) -> &RelayQueue<String> {
        &self.backlog
    }

    /// Local offset added to every inbound position
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    pub fn set_offset_ms(&mut self, offset_ms: i64) {
        self.offset_ms = offset_ms;
    }

    /// Nudge the offset forward one step
    pub fn offset_forward(&mut self) {
        self.offset_ms += OFFSET_STEP_MS;
    }

    /// Nudge the offset back one step
    pub fn offset_back(&mut self) {
        self.offset_ms -= OFFSET_STEP_MS;
    }

    /// Buffer one inbound payload
    pub fn ingest_payload(&self, payload: &[u8]) {
        ingest_payload(&self.backlog, payload);
    }

    /// Apply at most one buffered token to the player.
    ///
    /// Returns the applied event, `Ok(None)` when the backlog is empty, or
    /// an error for a token that is neither a command nor an integer time.
    /// The bad token is consumed; the rest of the backlog is untouched.
    pub fn apply_next(&mut self) -> Result<Option<TransportEvent>, SyncError> {
        let Some(token) = self.backlog.try_pop() else {
            return Ok(None);
        };
        let event = TransportEvent::decode(&token)?;
        debug!("Applying {:?}", event);
        match event {
            TransportEvent::ClearMarker => self.backlog.clear(),
            TransportEvent::Play => self.player.play(),
            TransportEvent::Pause => self.player.pause(),
            TransportEvent::Stop => self.player.stop(),
            // Bounds live where the rate change originates; the sender is
            // trusted here
            TransportEvent::RateUp => {
                self.player.set_rate(self.player.rate() * 2.0);
            }
            TransportEvent::RateDown => {
                self.player.set_rate(self.player.rate() * 0.5);
            }
            TransportEvent::SeekTo(ms) | TransportEvent::Heartbeat(ms) => {
                let target = ms + self.offset_ms;
                // Redundant seeks cause visible jitter
                if self.player.time_ms() != Some(target) {
                    self.player.set_time_ms(target);
                }
            }
        }
        Ok(Some(event))
    }
}
