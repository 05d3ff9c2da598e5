//! Replayable terminal state.
//!
//! The player core never interprets terminal contents. It drives an opaque
//! state through the [`Terminal`] trait and snapshots/restores that state
//! for seeking. A real renderer plugs a full ANSI emulator in here; the
//! crate ships [`Transcript`], a no-interpretation implementation used by
//! the tests and for headless text extraction.

use crate::asciicast::EventData;

/// State that a recording replays into.
///
/// Implementations must be deterministic: applying the same events in the
/// same order from the same starting state must produce interchangeable
/// states. Snapshot-based seeking reconstructs state from a cached snapshot
/// plus replay and is only exact when that holds.
pub trait Terminal {
    /// Independent copy of the state, cheap enough to store one per cached
    /// keyframe.
    type Snapshot: Clone;

    /// Fresh state for a recording of the given size.
    fn create(cols: u16, rows: u16) -> Self;

    /// Apply one event payload. Output mutates contents, resize changes
    /// dimensions; input and markers must leave the state unchanged.
    fn apply(&mut self, data: &EventData);

    /// Capture an independent copy of the current state.
    fn snapshot(&self) -> Self::Snapshot;

    /// Replace the current state with a previously captured snapshot.
    fn restore(&mut self, snapshot: &Self::Snapshot);
}

/// Plain-text terminal state: an append-only log of everything written to
/// the terminal, plus the current size. Escape sequences are kept verbatim,
/// not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    cols: u16,
    rows: u16,
    output: String,
}

impl Transcript {
    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Everything written to the terminal so far, verbatim.
    pub fn output(&self) -> &str {
        &self.output
    }
}

impl Terminal for Transcript {
    type Snapshot = Transcript;

    fn create(cols: u16, rows: u16) -> Self {
        Transcript {
            cols,
            rows,
            output: String::new(),
        }
    }

    fn apply(&mut self, data: &EventData) {
        match data {
            EventData::Output(text) => self.output.push_str(text),
            EventData::Resize(cols, rows) => {
                self.cols = *cols;
                self.rows = *rows;
            }
            EventData::Input(_) | EventData::Marker(_) => {}
        }
    }

    fn snapshot(&self) -> Transcript {
        self.clone()
    }

    fn restore(&mut self, snapshot: &Transcript) {
        self.clone_from(snapshot);
    }
}
