//! Playback for asciicast recordings.
//!
//! Provides everything between the parsed recording and a renderer: the
//! playback state machine with play/pause/variable speed, and keyframe
//! assisted seeking that stays fast on long recordings.
//!
//! # Architecture
//!
//! The player is organized into submodules:
//! - `state`: PlaybackState struct and shared types (MarkerPosition)
//! - `keyframes`: snapshot cache making seeks cost a lookup plus at most
//!   one interval of replay
//! - `engine`: the externally clocked state machine driving a terminal
//! - `markers`: marker collection for navigation
//!
//! # Usage
//!
//! ```no_run
//! use seekcast::{NullSink, PlaybackEngine, Recording, Transcript};
//!
//! let recording = Recording::open("session.cast").unwrap();
//! let mut engine: PlaybackEngine<Transcript, NullSink> =
//!     PlaybackEngine::new(recording, NullSink).unwrap();
//!
//! engine.play();
//! engine.tick(0.25).unwrap(); // from the embedder's clock
//! engine.seek(42.0).unwrap();
//! ```

pub mod engine;
pub mod keyframes;
pub mod markers;
pub mod state;

pub use engine::{EngineConfig, NullSink, PlaybackEngine, PlaybackSink};
pub use keyframes::{CacheStats, Keyframe, KeyframeCache};
pub use markers::collect_markers;
pub use state::{MarkerPosition, PlaybackMode, PlaybackState};
