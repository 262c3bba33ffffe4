//! Player facade
//!
//! The minimal surface the relay needs from the media engine. The engine
//! itself (decoding, rendering, windowing) is an external collaborator
//! owned by the controlling application.

/// Frame rate assumed when the engine does not report one
const FALLBACK_FPS: f32 = 25.0;

/// Minimal media-engine operations consumed by the relay
pub trait PlayerFacade: Send + Sync {
    /// Start or resume playback
    fn play(&self);
    /// Pause playback
    fn pause(&self);
    /// Stop playback
    fn stop(&self);
    /// Whether the engine is currently playing
    fn is_playing(&self) -> bool;
    /// Current position in milliseconds, `None` while no media is loaded
    fn time_ms(&self) -> Option<i64>;
    /// Seek to an absolute position in milliseconds
    fn set_time_ms(&self, ms: i64);
    /// Current playback rate multiplier
    fn rate(&self) -> f32;
    /// Set the playback rate; returns false if the engine rejected it
    fn set_rate(&self, rate: f32) -> bool;
    /// Position as a 0..1 fraction of the media length
    fn position(&self) -> f32;
    /// Seek to a 0..1 fraction of the media length
    fn set_position(&self, position: f32);
    /// Frame rate of the current media, 0.0 when unknown
    fn fps(&self) -> f32;
}

/// Milliseconds per frame at the given frame rate
pub fn mspf(fps: f32) -> i64 {
    let fps = if fps > 0.0 { fps } else { FALLBACK_FPS };
    (1000.0 / fps) as i64
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mspf() {
        assert_eq!(mspf(50.0), 20);
        assert_eq!(mspf(23.976), 41);
    }

    #[test]
    fn test_mspf_fallback_when_fps_unknown() {
        assert_eq!(mspf(0.0), 40);
    }
}
