//! Sender-side session
//!
//! Turns local transport actions into queued events for the channel
//! sender to publish. Constructed once per connection and dropped on
//! disconnect.

use std::sync::Arc;

use tracing::debug;

use crate::event::TransportEvent;
use crate::player::{mspf, PlayerFacade};
use crate::queue::RelayQueue;

/// Lowest playback rate a sender will request
pub const MIN_RATE: f32 = 0.125;

/// Highest playback rate a sender will request
pub const MAX_RATE: f32 = 64.0;

/// Minimum position advance between heartbeats, in milliseconds
pub const HEARTBEAT_INTERVAL_MS: i64 = 5000;

/// Direction for single-frame stepping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Forward,
    Backward,
}

/// Sender-side session state.
///
/// Every state-changing action clears the relay queue and emits a clear
/// marker ahead of the new event, so a receiver that lags behind drops its
/// stale backlog instead of replaying it: latest wins.
pub struct SenderSession {
    player: Arc<dyn PlayerFacade>,
    queue: RelayQueue<TransportEvent>,
    last_heartbeat_ms: i64,
}

impl SenderSession {
    pub fn new(player: Arc<dyn PlayerFacade>, queue: RelayQueue<TransportEvent>) -> Self {
        Self {
            player,
            queue,
            last_heartbeat_ms: 0,
        }
    }

    /// Queue shared with the channel sender
    pub fn queue(&self) -> &RelayQueue<TransportEvent> {
        &self.queue
    }

    fn emit(&self, events: &[TransportEvent]) {
        self.queue.clear();
        self.queue.push(TransportEvent::ClearMarker);
        for event in events {
            self.queue.push(*event);
        }
    }

    /// Start playback and announce it together with the current position
    pub fn play(&mut self) {
        self.player.play();
        let mut events = vec![TransportEvent::Play];
        if let Some(now) = self.player.time_ms() {
            events.push(TransportEvent::Heartbeat(now));
        }
        self.emit(&events);
    }

    /// Pause playback
    pub fn pause(&mut self) {
        self.player.pause();
        self.emit(&[TransportEvent::Pause]);
    }

    /// Toggle between play and pause
    pub fn toggle_play(&mut self) {
        if self.player.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.player.stop();
        self.emit(&[TransportEvent::Stop]);
    }

    /// Double the playback rate.
    ///
    /// Bounds are enforced here and only here; receivers trust the sender.
    /// If the engine rejects the new rate nothing is emitted.
    pub fn rate_up(&mut self) {
        let current = self.player.rate();
        if current >= MAX_RATE {
            return;
        }
        if self.player.set_rate(current * 2.0) {
            self.emit(&[TransportEvent::RateUp]);
        }
    }

    /// Halve the playback rate
    pub fn rate_down(&mut self) {
        let current = self.player.rate();
        if current <= MIN_RATE {
            return;
        }
        if self.player.set_rate(current * 0.5) {
            self.emit(&[TransportEvent::RateDown]);
        }
    }

    /// Step a single frame in the given direction
    pub fn step_frame(&mut self, direction: StepDirection) {
        let Some(now) = self.player.time_ms() else {
            return;
        };
        let frame = mspf(self.player.fps());
        let target = match direction {
            StepDirection::Forward => now + frame,
            StepDirection::Backward => now - frame,
        };
        self.emit(&[TransportEvent::SeekTo(target)]);
        self.player.set_time_ms(target);
    }

    /// Seek to a 0..1 media fraction (slider drag).
    ///
    /// Announces the position the player had before the jump; the next
    /// heartbeat corrects the receiver once the engine has settled.
    pub fn seek_to_position(&mut self, position: f32) {
        self.emit(&[]);
        // A stopped engine reports no time; never announce that
        let Some(now) = self.player.time_ms() else {
            return;
        };
        self.queue.push(TransportEvent::SeekTo(now));
        self.last_heartbeat_ms = now;
        self.player.set_position(position);
    }

    /// Heartbeat pump, called periodically by the owning application.
    ///
    /// While playing, announces the position every time it has advanced
    /// past the heartbeat interval; while idle, keeps the queue empty so a
    /// late-joining receiver never replays stale events.
    pub fn tick(&mut self) {
        if self.player.position() >= 0.0 && self.player.is_playing() {
            if let Some(now) = self.player.time_ms() {
                if now > self.last_heartbeat_ms + HEARTBEAT_INTERVAL_MS {
                    debug!("Heartbeat at {}ms", now);
                    self.queue.push(TransportEvent::Heartbeat(now));
                    self.last_heartbeat_ms = now;
                }
            }
        } else {
            self.queue.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::mock::{MockPlayer, PlayerCall};

    fn session(player: MockPlayer) -> (Arc<MockPlayer>, SenderSession) {
        let player = Arc::new(player);
        let queue = RelayQueue::new();
        let session = SenderSession::new(player.clone(), queue);
        (player, session)
    }

    fn drain(queue: &RelayQueue<TransportEvent>) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Some(event) = queue.try_pop() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_play_emits_clear_play_and_position() {
        let (player, mut session) = session(MockPlayer::new().with_time(Some(1234)));
        session.play();
        assert_eq!(
            drain(session.queue()),
            vec![
                TransportEvent::ClearMarker,
                TransportEvent::Play,
                TransportEvent::Heartbeat(1234),
            ]
        );
        assert_eq!(player.calls(), vec![PlayerCall::Play]);
    }

    #[test]
    fn test_pause_and_stop() {
        let (_, mut session) = session(MockPlayer::new());
        session.pause();
        assert_eq!(
            drain(session.queue()),
            vec![TransportEvent::ClearMarker, TransportEvent::Pause]
        );
        session.stop();
        assert_eq!(
            drain(session.queue()),
            vec![TransportEvent::ClearMarker, TransportEvent::Stop]
        );
    }

    #[test]
    fn test_toggle_play_dispatches_on_engine_state() {
        let (player, mut session) = session(MockPlayer::new().with_playing(true));
        session.toggle_play();
        assert_eq!(player.calls(), vec![PlayerCall::Pause]);
        // Now paused, so the next toggle plays
        session.toggle_play();
        assert_eq!(player.calls()[1], PlayerCall::Play);
    }

    #[test]
    fn test_state_change_replaces_queued_events() {
        let (_, mut session) = session(MockPlayer::new().with_time(Some(0)));
        session.play();
        session.pause();
        // Only the latest action survives
        assert_eq!(
            drain(session.queue()),
            vec![TransportEvent::ClearMarker, TransportEvent::Pause]
        );
    }

    #[test]
    fn test_rate_up_bounded_at_64() {
        let (player, mut session) = session(MockPlayer::new());
        for _ in 0..6 {
            session.rate_up();
        }
        assert_eq!(player.rate(), 64.0);
        // Seventh attempt would reach 128 and must be a no-op
        session.rate_up();
        assert_eq!(player.rate(), 64.0);
        let rate_calls = player
            .calls()
            .iter()
            .filter(|c| matches!(c, PlayerCall::SetRate(_)))
            .count();
        assert_eq!(rate_calls, 6);
    }

    #[test]
    fn test_rate_down_bounded_at_eighth() {
        let (player, mut session) = session(MockPlayer::new());
        for _ in 0..3 {
            session.rate_down();
        }
        assert_eq!(player.rate(), 0.125);
        session.rate_down();
        assert_eq!(player.rate(), 0.125);
    }

    #[test]
    fn test_rejected_rate_change_emits_nothing() {
        let (player, mut session) = session(MockPlayer::new().reject_rate_changes());
        session.rate_up();
        assert!(session.queue().is_empty());
        assert_eq!(player.rate(), 1.0);
    }

    #[test]
    fn test_step_frame_uses_engine_fps() {
        let (player, mut session) =
            session(MockPlayer::new().with_time(Some(1000)).with_fps(50.0));
        session.step_frame(StepDirection::Forward);
        assert_eq!(
            drain(session.queue()),
            vec![TransportEvent::ClearMarker, TransportEvent::SeekTo(1020)]
        );
        assert_eq!(player.calls(), vec![PlayerCall::SetTime(1020)]);
    }

    #[test]
    fn test_step_frame_backward_with_fps_fallback() {
        let (player, mut session) = session(MockPlayer::new().with_time(Some(1000)));
        session.step_frame(StepDirection::Backward);
        // Unknown fps falls back to 25, so one frame is 40ms
        assert_eq!(
            drain(session.queue()),
            vec![TransportEvent::ClearMarker, TransportEvent::SeekTo(960)]
        );
        assert_eq!(player.calls(), vec![PlayerCall::SetTime(960)]);
    }

    #[test]
    fn test_seek_announces_current_position() {
        let (player, mut session) = session(MockPlayer::new().with_time(Some(30_000)));
        session.seek_to_position(0.5);
        assert_eq!(
            drain(session.queue()),
            vec![TransportEvent::ClearMarker, TransportEvent::SeekTo(30_000)]
        );
        assert_eq!(player.calls(), vec![PlayerCall::SetPosition(0.5)]);
    }

    #[test]
    fn test_seek_guard_without_media() {
        let (player, mut session) = session(MockPlayer::new().with_time(None));
        session.seek_to_position(0.5);
        // The clear marker still goes out, but no position and no local seek
        assert_eq!(drain(session.queue()), vec![TransportEvent::ClearMarker]);
        assert!(player.calls().is_empty());
    }

    #[test]
    fn test_heartbeat_threshold() {
        let (player, mut session) = session(MockPlayer::new().with_playing(true));
        player.set_clock(4000);
        session.tick();
        assert!(session.queue().is_empty());

        player.set_clock(5001);
        session.tick();
        assert_eq!(
            drain(session.queue()),
            vec![TransportEvent::Heartbeat(5001)]
        );

        // Not enough advance since the last heartbeat
        player.set_clock(9000);
        session.tick();
        assert!(session.queue().is_empty());

        player.set_clock(10_002);
        session.tick();
        assert_eq!(
            drain(session.queue()),
            vec![TransportEvent::Heartbeat(10_002)]
        );
    }

    #[test]
    fn test_idle_tick_clears_queue() {
        let (_, mut session) = session(MockPlayer::new().with_playing(false));
        session.queue().push(TransportEvent::Heartbeat(1000));
        session.tick();
        assert!(session.queue().is_empty());
    }
}
