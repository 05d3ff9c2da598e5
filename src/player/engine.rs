//! Playback engine: the state machine that turns external clock ticks into
//! ordered event emission, and seeks into snapshot-plus-replay state
//! reconstruction.
//!
//! The engine owns no clock and spawns no threads. Whatever embeds it (a
//! TUI event loop, a test) calls [`tick`](PlaybackEngine::tick) with elapsed
//! wall time and the engine advances its simulated position by
//! `elapsed * speed`, applying every event that falls due. That keeps the
//! core deterministic: the same calls in the same order always produce the
//! same states, which is also what makes it testable without timers.

use tracing::{debug, trace};

use crate::asciicast::{CastError, Event, EventStream, Header, Recording};
use crate::player::keyframes::{CacheStats, KeyframeCache};
use crate::player::state::{PlaybackMode, PlaybackState};
use crate::terminal::Terminal;

/// Receives what the engine produces. Implemented by renderers and UIs.
pub trait PlaybackSink<S> {
    /// Full-state refresh after a seek. The previous contents are invalid
    /// and must be replaced wholesale, not appended to.
    fn on_state_reset(&mut self, state: &S);

    /// One event emitted during forward playback. Events arrive in
    /// non-decreasing time order, each exactly once; events replayed
    /// internally by a seek never show up here.
    fn on_event_applied(&mut self, event: &Event);

    /// Position after every tick taken while playing and after every seek.
    fn on_position_changed(&mut self, position: f64);
}

/// Sink that ignores everything. For headless use: prewarming, text
/// extraction, tests that only care about terminal state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl<S> PlaybackSink<S> for NullSink {
    fn on_state_reset(&mut self, _state: &S) {}
    fn on_event_applied(&mut self, _event: &Event) {}
    fn on_position_changed(&mut self, _position: f64) {}
}

/// Engine construction options.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Simulated seconds between keyframe snapshots.
    pub keyframe_interval: f64,
    /// Treat the recording as still growing: skip duration resolution at
    /// open, keep playing at end of file instead of stopping, and clamp
    /// seeks to the furthest position reached so far.
    pub live: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            keyframe_interval: 1.0,
            live: false,
        }
    }
}

/// Drives one recording through one terminal state.
///
/// Single-threaded and externally clocked: nothing happens between calls.
/// `T` is the terminal the events replay into, `K` is where emitted events
/// and state changes go.
pub struct PlaybackEngine<T: Terminal, K: PlaybackSink<T::Snapshot>> {
    recording: Recording,
    /// Total duration; `None` while a live recording's end is unknown.
    duration: Option<f64>,
    state: PlaybackState,
    terminal: T,
    /// State at time zero, the seek base when no keyframe applies yet.
    initial: T::Snapshot,
    cache: KeyframeCache<T::Snapshot>,
    sink: K,
    /// Forward cursor over the event sequence, in lockstep with
    /// `state.event_idx` plus the read-ahead below.
    stream: EventStream,
    /// Next event pulled from the stream but not yet due.
    pending: Option<Event>,
    /// Furthest simulated time reached or parsed so far; bounds seeks when
    /// the duration is unknown.
    horizon: f64,
}

impl<T, K> PlaybackEngine<T, K>
where
    T: Terminal,
    K: PlaybackSink<T::Snapshot>,
{
    pub fn new(recording: Recording, sink: K) -> Result<Self, CastError> {
        Self::with_config(recording, sink, EngineConfig::default())
    }

    /// Build an engine with explicit options.
    ///
    /// # Panics
    /// Panics if `config.keyframe_interval` is not a positive number.
    pub fn with_config(
        recording: Recording,
        sink: K,
        config: EngineConfig,
    ) -> Result<Self, CastError> {
        let duration = if config.live {
            None
        } else {
            Some(recording.duration()?)
        };
        let header = recording.header();
        let terminal = T::create(header.width, header.height);
        let initial = terminal.snapshot();
        let stream = if config.live {
            recording.events_tailing()?
        } else {
            recording.events()?
        };
        debug!(
            path = %recording.path().display(),
            ?duration,
            keyframe_interval = config.keyframe_interval,
            "playback engine ready"
        );

        Ok(Self {
            recording,
            duration,
            state: PlaybackState::new(),
            terminal,
            initial,
            cache: KeyframeCache::new(config.keyframe_interval),
            sink,
            stream,
            pending: None,
            horizon: 0.0,
        })
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn header(&self) -> &Header {
        self.recording.header()
    }

    /// Total duration in seconds, unknown for live recordings.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn position(&self) -> f64 {
        self.state.position
    }

    pub fn speed(&self) -> f64 {
        self.state.speed
    }

    pub fn mode(&self) -> PlaybackMode {
        self.state.mode
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Snapshot of the terminal state at the current position.
    pub fn current_state(&self) -> T::Snapshot {
        self.terminal.snapshot()
    }

    pub fn keyframes(&self) -> &KeyframeCache<T::Snapshot> {
        &self.cache
    }

    pub fn keyframe_stats(&self) -> CacheStats {
        self.cache.stats(self.duration)
    }

    /// Start or resume playback. No-op while already playing.
    pub fn play(&mut self) {
        if matches!(self.state.mode, PlaybackMode::Stopped | PlaybackMode::Paused) {
            self.state.mode = PlaybackMode::Playing;
        }
    }

    /// Freeze at the current position. Resuming continues exactly here.
    /// No-op unless playing.
    pub fn pause(&mut self) {
        if self.state.mode == PlaybackMode::Playing {
            self.state.mode = PlaybackMode::Paused;
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.state.mode {
            PlaybackMode::Playing => self.pause(),
            _ => self.play(),
        }
    }

    /// Set the speed multiplier for subsequent ticks. The position does not
    /// move; out-of-range requests are clamped, not rejected.
    pub fn set_speed(&mut self, speed: f64) {
        self.state.speed = PlaybackState::clamp_speed(speed);
    }

    /// Advance playback by `elapsed` wall-clock seconds.
    ///
    /// Moves the position forward by `elapsed * speed`, emitting every event
    /// that falls due, in order, each exactly once. No-op unless playing and
    /// for non-positive `elapsed`. Reaching the known duration stops
    /// playback; a live engine just keeps polling for more events.
    pub fn tick(&mut self, elapsed: f64) -> Result<(), CastError> {
        if self.state.mode != PlaybackMode::Playing || !(elapsed > 0.0) {
            return Ok(());
        }

        let mut target = self.state.position + elapsed * self.state.speed;
        if let Some(duration) = self.duration {
            target = target.min(duration);
        }

        let emitted = self.emit_until(target)?;
        if emitted > 0 {
            trace!(position = target, emitted, "tick");
        }

        self.state.position = target;
        self.horizon = self.horizon.max(target);
        if self.duration.is_some_and(|d| target >= d) {
            self.state.mode = PlaybackMode::Stopped;
        }
        self.sink.on_position_changed(self.state.position);
        Ok(())
    }

    /// Reposition playback to `target` seconds.
    ///
    /// The terminal state is rebuilt from the nearest prior keyframe (or the
    /// initial state) plus replay of the residual events, so the cost is the
    /// keyframe lookup plus at most one interval of replay once the cache is
    /// warm. Out-of-range targets clamp to `[0, duration]`; on a live
    /// recording the upper bound is the furthest position reached so far.
    ///
    /// The sink sees a single full-state refresh and a position change,
    /// never the replayed events. Playback stays playing if it was playing,
    /// otherwise the engine is left paused at the target. If reading the
    /// recording fails, playback is left exactly as it was.
    pub fn seek(&mut self, target: f64) -> Result<(), CastError> {
        if target.is_nan() {
            return Ok(());
        }
        let limit = self.duration.unwrap_or(self.horizon).max(0.0);
        let target = target.clamp(0.0, limit);

        let prior_mode = self.state.mode;
        self.state.mode = PlaybackMode::Seeking;
        match self.rebuild_at(target) {
            Ok(()) => {
                self.state.mode = if prior_mode == PlaybackMode::Playing {
                    PlaybackMode::Playing
                } else {
                    PlaybackMode::Paused
                };
                self.sink.on_position_changed(self.state.position);
                Ok(())
            }
            Err(e) => {
                self.state.mode = prior_mode;
                Err(e)
            }
        }
    }

    /// Build keyframes up to `until` simulated seconds without disturbing
    /// playback: position, live terminal state and sink are all untouched.
    /// Replay happens on a scratch terminal starting from the furthest
    /// keyframe already cached.
    pub fn prewarm(&mut self, until: f64) -> Result<(), CastError> {
        if until.is_nan() {
            return Ok(());
        }
        let until = match self.duration {
            Some(duration) => until.min(duration),
            None => until,
        };
        if self.cache.last().is_some_and(|kf| kf.time >= until) {
            return Ok(());
        }

        let header = self.recording.header();
        let mut scratch = T::create(header.width, header.height);
        let mut index = 0;
        if let Some(kf) = self.cache.last() {
            scratch.restore(kf.snapshot());
            index = kf.event_index;
        }

        let mut stream = self.open_stream()?;
        stream.skip_events(index)?;
        let before = self.cache.len();
        while let Some(event) = stream.next_event()? {
            if event.time > until {
                break;
            }
            self.cache.note_event(event.time, index, || scratch.snapshot());
            scratch.apply(&event.data);
            index += 1;
            self.horizon = self.horizon.max(event.time);
        }
        debug!(until, built = self.cache.len() - before, "prewarmed keyframe cache");
        Ok(())
    }

    /// Emit every not-yet-emitted event with `time <= target`, feeding the
    /// live terminal and the keyframe cache along the way.
    fn emit_until(&mut self, target: f64) -> Result<usize, CastError> {
        let mut emitted = 0;
        loop {
            if self.pending.is_none() {
                self.pending = self.stream.next_event()?;
            }
            match &self.pending {
                Some(event) if event.time <= target => {}
                _ => break,
            }
            if let Some(event) = self.pending.take() {
                let index = self.state.event_idx;
                let terminal = &self.terminal;
                self.cache.note_event(event.time, index, || terminal.snapshot());
                self.terminal.apply(&event.data);
                self.sink.on_event_applied(&event);
                self.state.event_idx = index + 1;
                self.horizon = self.horizon.max(event.time);
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    /// Open a fresh event stream the way this engine reads its recording:
    /// tailing when live, so partial final lines are held back, plain
    /// otherwise. An unknown duration is what marks the engine live.
    fn open_stream(&self) -> Result<EventStream, CastError> {
        if self.duration.is_none() {
            self.recording.events_tailing()
        } else {
            self.recording.events()
        }
    }

    /// Rebuild the terminal for a seek: restore the nearest base snapshot
    /// onto a scratch terminal, stream the residual events onto it, then
    /// swap the result in. Events are applied as they are pulled, never
    /// collected, so the rebuild's memory use does not grow with the
    /// recording. A failed read leaves playback exactly as it was; keyframes
    /// captured during the replay are kept either way, since they describe
    /// fully replayed states.
    fn rebuild_at(&mut self, target: f64) -> Result<(), CastError> {
        let header = self.recording.header();
        let mut scratch = T::create(header.width, header.height);
        let base_index = match self.cache.resolve(target) {
            Some(kf) => {
                scratch.restore(kf.snapshot());
                kf.event_index
            }
            None => {
                scratch.restore(&self.initial);
                0
            }
        };

        let mut stream = self.open_stream()?;
        stream.skip_events(base_index)?;

        let mut index = base_index;
        let mut pending = None;
        while let Some(event) = stream.next_event()? {
            if event.time > target {
                pending = Some(event);
                break;
            }
            self.cache.note_event(event.time, index, || scratch.snapshot());
            scratch.apply(&event.data);
            index += 1;
        }
        debug!(
            target,
            base_index,
            replayed = index - base_index,
            "rebuilt state for seek"
        );

        // Nothing below can fail.
        if let Some(event) = &pending {
            self.horizon = self.horizon.max(event.time);
        }
        self.terminal = scratch;
        self.stream = stream;
        self.pending = pending;
        self.state.position = target;
        self.state.event_idx = index;
        self.horizon = self.horizon.max(target);

        let refreshed = self.terminal.snapshot();
        self.sink.on_state_reset(&refreshed);
        Ok(())
    }
}
