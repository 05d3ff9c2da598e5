//! Keyframe cache: terminal-state snapshots on a fixed simulated-time grid.
//!
//! Without snapshots, seeking means replaying every event from time zero,
//! which gets slower the further into the recording the target lies. With a
//! snapshot every `interval` seconds, a seek costs a binary search to find
//! a base plus at most one interval's worth of replay.
//!
//! The cache is append-only and fills in only while events are traversed
//! forward (playback, seek replay, prewarm), so every snapshot comes from a
//! state that was itself reached by linear replay. That is the correctness
//! contract seeking relies on.

use tracing::debug;

/// One cached snapshot: the terminal state immediately before the event at
/// `event_index` was applied.
#[derive(Debug, Clone)]
pub struct Keyframe<S> {
    /// Grid time this keyframe covers. Strictly increasing across the cache.
    pub time: f64,
    /// Index of the first event not reflected in the snapshot.
    pub event_index: usize,
    /// Events between the previous keyframe and this one, i.e. the replay
    /// work a seek through this keyframe avoids. Input for a future eviction
    /// policy; nothing is evicted today.
    pub cost: usize,
    snapshot: S,
}

impl<S> Keyframe<S> {
    pub fn snapshot(&self) -> &S {
        &self.snapshot
    }
}

/// Append-only, time-ordered collection of keyframes.
#[derive(Debug)]
pub struct KeyframeCache<S> {
    interval: f64,
    next_boundary: f64,
    frames: Vec<Keyframe<S>>,
}

impl<S> KeyframeCache<S> {
    /// `interval` is the simulated-time spacing between snapshots.
    ///
    /// # Panics
    /// Panics if `interval` is not a positive number.
    pub fn new(interval: f64) -> Self {
        assert!(interval > 0.0, "keyframe interval must be positive");
        KeyframeCache {
            interval,
            next_boundary: interval,
            frames: Vec::new(),
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn last(&self) -> Option<&Keyframe<S>> {
        self.frames.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyframe<S>> {
        self.frames.iter()
    }

    /// Report an event about to be applied during forward traversal.
    ///
    /// If the event's time has reached the next grid boundary, the state
    /// *before* the event is captured (the closure only runs then) and the
    /// boundary advances past the event's time. An idle gap therefore yields
    /// a single keyframe, not a run of identical ones, and the capture stays
    /// O(1) amortized per event.
    pub fn note_event(&mut self, time: f64, event_index: usize, snapshot: impl FnOnce() -> S) {
        if time < self.next_boundary {
            return;
        }

        let boundary = self.next_boundary;
        let previous_index = self.frames.last().map_or(0, |kf| kf.event_index);
        self.frames.push(Keyframe {
            time: boundary,
            event_index,
            cost: event_index.saturating_sub(previous_index),
            snapshot: snapshot(),
        });
        self.next_boundary = (time / self.interval).floor() * self.interval + self.interval;
        debug!(time = boundary, event_index, "captured keyframe");
    }

    /// Latest keyframe with `time <= target`, or `None` when the initial
    /// state at time zero is the best available base. Targets beyond the
    /// last keyframe resolve to the last keyframe.
    pub fn resolve(&self, target: f64) -> Option<&Keyframe<S>> {
        let idx = self.frames.partition_point(|kf| kf.time <= target);
        if idx == 0 {
            None
        } else {
            Some(&self.frames[idx - 1])
        }
    }

    /// Summary of what the cache currently holds. `duration`, when known,
    /// feeds the coverage ratio.
    pub fn stats(&self, duration: Option<f64>) -> CacheStats {
        let total_cost = self.frames.iter().map(|kf| kf.cost).sum();
        let coverage = match duration {
            Some(d) if d > 0.0 => (self.frames.len() as f64 * self.interval / d).min(1.0),
            _ => 0.0,
        };
        CacheStats {
            keyframes: self.frames.len(),
            total_cost,
            coverage,
        }
    }
}

/// Cache summary for status displays and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Number of stored keyframes.
    pub keyframes: usize,
    /// Sum of per-keyframe costs: how many events a seek to the last
    /// keyframe skips over in total.
    pub total_cost: usize,
    /// Fraction of the recording's duration covered, in `[0, 1]`. Zero when
    /// the duration is unknown.
    pub coverage: f64,
}
