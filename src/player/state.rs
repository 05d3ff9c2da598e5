//! Player state management
//!
//! Contains the `PlaybackState` struct describing where a playback is and
//! how fast it moves, plus shared types used across player modules.

/// What the engine is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Before the first play, or after the end of the recording was reached.
    Stopped,
    /// Simulated time advances as ticks arrive.
    Playing,
    /// Position frozen; resuming continues exactly where playback left off.
    Paused,
    /// Inside a seek. Entered and left within a single `seek` call.
    Seeking,
}

/// Marker information for the progress bar.
///
/// Tracks the absolute time and label for each marker in the recording.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPosition {
    /// Time in seconds when the marker occurs
    pub time: f64,
    /// Marker label (from the cast file)
    pub label: String,
}

/// Position, speed and mode of one playback.
///
/// Owned and mutated by the engine; callers observe it through the engine's
/// accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Current position in simulated seconds
    pub position: f64,
    /// Playback speed multiplier (1.0 = recorded pace)
    pub speed: f64,
    /// Current mode
    pub mode: PlaybackMode,
    /// Index of the first event not yet emitted
    pub event_idx: usize,
}

impl PlaybackState {
    /// Slowest supported playback speed.
    pub const MIN_SPEED: f64 = 0.1;
    /// Fastest supported playback speed.
    pub const MAX_SPEED: f64 = 5.0;

    pub fn new() -> Self {
        Self {
            position: 0.0,
            speed: 1.0,
            mode: PlaybackMode::Stopped,
            event_idx: 0,
        }
    }

    /// Clamp a requested speed into the supported range. Zero, negative and
    /// infinite requests land on the nearest bound; NaN falls back to 1.0.
    pub fn clamp_speed(speed: f64) -> f64 {
        if speed.is_nan() {
            return 1.0;
        }
        speed.clamp(Self::MIN_SPEED, Self::MAX_SPEED)
    }

    pub fn is_playing(&self) -> bool {
        self.mode == PlaybackMode::Playing
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}
