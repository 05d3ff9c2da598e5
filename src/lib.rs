//! Seekable playback core for asciicast terminal session recordings.
//!
//! seekcast parses [asciicast v2](https://docs.asciinema.org/manual/asciicast/v2/)
//! files (plain or gzipped), streams their events lazily, and drives an
//! externally clocked playback engine with play, pause, variable speed and
//! seeking. Seeks are made fast by a cache of terminal-state keyframes
//! taken at a fixed simulated-time interval: jumping anywhere in a long
//! recording costs a binary search plus at most one interval of replay,
//! instead of replaying from the start.
//!
//! What this crate deliberately does not do: render, interpret ANSI escape
//! sequences, or talk to a real terminal. Those concerns plug in behind two
//! seams: [`Terminal`] is the state events replay into (bring your own
//! emulator; [`Transcript`] is the bundled plain-text one), and
//! [`PlaybackSink`] is where emitted events and state changes go.
//!
//! ```no_run
//! use seekcast::{NullSink, PlaybackEngine, Recording, Transcript};
//!
//! let recording = Recording::open("session.cast").unwrap();
//! let mut engine: PlaybackEngine<Transcript, NullSink> =
//!     PlaybackEngine::new(recording, NullSink).unwrap();
//!
//! engine.play();
//! engine.tick(0.25).unwrap();
//! engine.seek(42.0).unwrap();
//! println!("at {:.1}s: {} bytes of output",
//!     engine.position(),
//!     engine.current_state().output().len());
//! ```

pub mod asciicast;
pub mod player;
pub mod terminal;

pub use asciicast::{
    CastError, Event, EventData, EventParseError, EventStream, Header, Recording, TimeWindow,
};
pub use player::{
    collect_markers, CacheStats, EngineConfig, Keyframe, KeyframeCache, MarkerPosition, NullSink,
    PlaybackEngine, PlaybackMode, PlaybackSink, PlaybackState,
};
pub use terminal::{Terminal, Transcript};
