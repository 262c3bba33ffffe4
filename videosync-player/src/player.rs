//! Simulated media engine
//!
//! Stands in for a real player: a clock that advances in real time scaled
//! by the playback rate while playing. Lets the relay be exercised against
//! a broker without any video stack.

use std::time::Instant;

use parking_lot::Mutex;
use videosync_core::PlayerFacade;

/// Nominal media length used for position fractions, in milliseconds
const MEDIA_LENGTH_MS: i64 = 90 * 60 * 1000;

/// Frame rate reported to the relay
const NOMINAL_FPS: f32 = 25.0;

struct Transport {
    playing: bool,
    /// Position when `anchor` was taken
    base_ms: i64,
    /// Wall-clock anchor for advancing the position
    anchor: Instant,
    rate: f32,
    /// Stopped engines report no time, like a player with no media
    stopped: bool,
}

impl Transport {
    fn current_ms(&self) -> i64 {
        if self.playing {
            let elapsed = self.anchor.elapsed().as_millis() as i64;
            self.base_ms + (elapsed as f64 * self.rate as f64) as i64
        } else {
            self.base_ms
        }
    }

    /// Fold the elapsed time into the base so rate changes take effect
    /// from the current position
    fn freeze(&mut self) {
        self.base_ms = self.current_ms();
        self.anchor = Instant::now();
    }
}

pub struct SimulatedPlayer {
    transport: Mutex<Transport>,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self {
            transport: Mutex::new(Transport {
                playing: false,
                base_ms: 0,
                anchor: Instant::now(),
                rate: 1.0,
                stopped: true,
            }),
        }
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerFacade for SimulatedPlayer {
    fn play(&self) {
        let mut transport = self.transport.lock();
        transport.freeze();
        transport.playing = true;
        transport.stopped = false;
    }

    fn pause(&self) {
        let mut transport = self.transport.lock();
        transport.freeze();
        transport.playing = false;
    }

    fn stop(&self) {
        let mut transport = self.transport.lock();
        transport.playing = false;
        transport.base_ms = 0;
        transport.anchor = Instant::now();
        transport.stopped = true;
    }

    fn is_playing(&self) -> bool {
        self.transport.lock().playing
    }

    fn time_ms(&self) -> Option<i64> {
        let transport = self.transport.lock();
        if transport.stopped {
            None
        } else {
            Some(transport.current_ms())
        }
    }

    fn set_time_ms(&self, ms: i64) {
        let mut transport = self.transport.lock();
        transport.base_ms = ms;
        transport.anchor = Instant::now();
        transport.stopped = false;
    }

    fn rate(&self) -> f32 {
        self.transport.lock().rate
    }

    fn set_rate(&self, rate: f32) -> bool {
        if rate <= 0.0 {
            return false;
        }
        let mut transport = self.transport.lock();
        transport.freeze();
        transport.rate = rate;
        true
    }

    fn position(&self) -> f32 {
        let transport = self.transport.lock();
        (transport.current_ms() as f32 / MEDIA_LENGTH_MS as f32).clamp(0.0, 1.0)
    }

    fn set_position(&self, position: f32) {
        let ms = (position.clamp(0.0, 1.0) as f64 * MEDIA_LENGTH_MS as f64) as i64;
        let mut transport = self.transport.lock();
        transport.base_ms = ms;
        transport.anchor = Instant::now();
        transport.stopped = false;
    }

    fn fps(&self) -> f32 {
        NOMINAL_FPS
    }
}
