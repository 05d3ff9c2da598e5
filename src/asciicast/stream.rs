//! Lazy event streaming over an opened recording.

use std::io::BufRead;
use std::path::PathBuf;

use tracing::warn;

use super::{CastError, Event, EventParseError};

/// Pull-based reader over the event lines of a recording.
///
/// Lines are read and parsed on demand: opening a multi-gigabyte recording
/// costs nothing until events are actually pulled. A corrupt line is skipped
/// and counted rather than ending the stream, so everything after it still
/// plays; blank lines are skipped silently. `Ok(None)` means end of input as
/// of now, not forever: pulling again later picks up lines appended in the
/// meantime, which is what live playback of a growing file relies on.
///
/// In tailing mode (see [`Recording::events_tailing`](super::Recording::events_tailing))
/// a final line with no newline yet is held back as not-yet-written rather
/// than treated as corrupt, so a recorder caught mid-write loses nothing.
pub struct EventStream {
    reader: Box<dyn BufRead>,
    path: PathBuf,
    /// Reused line buffer. In tailing mode it carries a partial final line
    /// between polls until the newline arrives.
    line: Vec<u8>,
    /// File line number of the most recently read line. The header is line 1.
    line_no: u64,
    events_read: usize,
    skipped: Vec<u64>,
    tailing: bool,
}

impl EventStream {
    pub(crate) fn new(reader: Box<dyn BufRead>, path: PathBuf, tailing: bool) -> Self {
        EventStream {
            reader,
            path,
            line: Vec::new(),
            line_no: 1,
            events_read: 0,
            skipped: Vec::new(),
            tailing,
        }
    }

    /// Number of events produced so far; equivalently, the index of the next
    /// event this stream will produce.
    pub fn next_index(&self) -> usize {
        self.events_read
    }

    /// 1-based file line numbers of lines skipped as corrupt.
    pub fn skipped_lines(&self) -> &[u64] {
        &self.skipped
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Pull the next event, skipping past corrupt and blank lines.
    ///
    /// `Err` is reserved for I/O failure of the underlying source; parse
    /// failure of a single line never surfaces here.
    pub fn next_event(&mut self) -> Result<Option<Event>, CastError> {
        loop {
            self.reader
                .read_until(b'\n', &mut self.line)
                .map_err(|source| CastError::Source {
                    path: self.path.clone(),
                    source,
                })?;
            if self.line.is_empty() {
                return Ok(None);
            }
            if self.tailing && !self.line.ends_with(b"\n") {
                // Mid-write tail of a growing file. Keep the bytes and pick
                // the line back up once the recorder has finished it.
                return Ok(None);
            }
            self.line_no += 1;

            let parsed = parse_line(&self.line);
            self.line.clear();
            match parsed {
                Ok(Some(event)) => {
                    self.events_read += 1;
                    return Ok(Some(event));
                }
                Ok(None) => continue,
                Err(reason) => {
                    warn!(
                        path = %self.path.display(),
                        line = self.line_no,
                        %reason,
                        "skipping unparseable event line"
                    );
                    self.skipped.push(self.line_no);
                }
            }
        }
    }

    /// Read and discard `count` events. Corrupt-line skipping still applies,
    /// so this counts valid events, not file lines. Returns how many were
    /// actually discarded, smaller only if the stream ended first.
    pub fn skip_events(&mut self, count: usize) -> Result<usize, CastError> {
        let mut discarded = 0;
        while discarded < count {
            if self.next_event()?.is_none() {
                break;
            }
            discarded += 1;
        }
        Ok(discarded)
    }
}

fn parse_line(raw: &[u8]) -> Result<Option<Event>, EventParseError> {
    let text = std::str::from_utf8(raw).map_err(|_| EventParseError::Utf8)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Event::parse(trimmed).map(Some)
}

impl Iterator for EventStream {
    type Item = Result<Event, CastError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

/// Lazy iterator over events whose time falls in a half-open window
/// `[from, to)`.
///
/// Relies on event times being non-decreasing: the underlying stream is
/// abandoned at the first event at or past `to`, so nothing beyond the
/// window is parsed.
pub struct TimeWindow {
    stream: EventStream,
    from: f64,
    to: f64,
    done: bool,
}

impl TimeWindow {
    pub(crate) fn new(stream: EventStream, from: f64, to: f64) -> Self {
        TimeWindow {
            stream,
            from,
            to,
            done: false,
        }
    }
}

impl Iterator for TimeWindow {
    type Item = Result<Event, CastError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.stream.next_event() {
                Ok(Some(event)) => {
                    if event.time < self.from {
                        continue;
                    }
                    if event.time < self.to {
                        return Some(Ok(event));
                    }
                    self.done = true;
                    return None;
                }
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
