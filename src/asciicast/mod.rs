//! asciicast v2 format parser.
//!
//! Reference: https://docs.asciinema.org/manual/asciicast/v2/
//!
//! A recording is line-oriented UTF-8: the first line is a JSON header
//! object, every following line is one JSON event array `[time, code, data]`
//! with an absolute time in seconds. Files may be gzip-compressed on disk;
//! decompression is transparent and detected from content, so a `.gz` name
//! on a plain file (or the reverse) still reads correctly.
//!
//! Parsing is built for playback rather than validation: the header is
//! checked strictly up front, but event lines are pulled lazily and a
//! corrupt line is skipped and counted instead of aborting, so a recording
//! truncated mid-write still plays as far as it validly can.

mod stream;

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::debug;

pub use stream::{EventStream, TimeWindow};

/// The asciicast major version this parser implements.
pub const SUPPORTED_VERSION: u64 = 2;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// Errors that end an open or a read. Corrupt individual event lines are not
/// represented here: those are skipped and reported by [`EventStream`].
#[derive(Debug, thiserror::Error)]
pub enum CastError {
    /// The underlying byte source cannot be opened or read.
    #[error("cannot read {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file has no header line at all.
    #[error("recording has no header line")]
    Empty,

    /// The first line is present but is not a usable asciicast header.
    #[error("invalid recording header: {reason}")]
    InvalidHeader { reason: String },

    /// The header decodes but declares a major version this parser does not
    /// implement.
    #[error("unsupported asciicast version {found} (this player implements version 2)")]
    UnsupportedVersion { found: u64 },
}

/// asciicast v2 header: terminal geometry plus free-form recording metadata.
///
/// Unknown additional fields (`theme`, future extensions) are tolerated and
/// ignored, so headers written by newer revisions of the format still open.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Header {
    pub version: u64,
    /// Terminal width in columns at the start of the recording.
    pub width: u16,
    /// Terminal height in rows at the start of the recording.
    pub height: u16,
    /// Unix timestamp of when the recording started.
    pub timestamp: Option<u64>,
    /// Declared total duration in seconds. Absent for recordings that were
    /// never finalized (killed mid-write, or still being appended to).
    pub duration: Option<f64>,
    pub idle_time_limit: Option<f64>,
    pub command: Option<String>,
    pub title: Option<String>,
    pub env: Option<HashMap<String, String>>,
}

/// Payload of a single recording event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    /// Bytes written to the terminal by the recorded process.
    Output(String),
    /// Bytes typed by the user. Carried through for completeness; terminal
    /// state does not change when these replay.
    Input(String),
    /// Terminal resized to (cols, rows).
    Resize(u16, u16),
    /// Annotation label, used for navigation.
    Marker(String),
}

impl EventData {
    /// The format's single-character event code.
    pub fn code(&self) -> char {
        match self {
            EventData::Output(_) => 'o',
            EventData::Input(_) => 'i',
            EventData::Resize(..) => 'r',
            EventData::Marker(_) => 'm',
        }
    }
}

/// One timestamped unit of a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Absolute seconds since the start of the recording. Non-decreasing
    /// across a well-formed recording.
    pub time: f64,
    pub data: EventData,
}

impl Event {
    pub fn output(time: f64, data: impl Into<String>) -> Self {
        Event {
            time,
            data: EventData::Output(data.into()),
        }
    }

    pub fn input(time: f64, data: impl Into<String>) -> Self {
        Event {
            time,
            data: EventData::Input(data.into()),
        }
    }

    pub fn resize(time: f64, cols: u16, rows: u16) -> Self {
        Event {
            time,
            data: EventData::Resize(cols, rows),
        }
    }

    pub fn marker(time: f64, label: impl Into<String>) -> Self {
        Event {
            time,
            data: EventData::Marker(label.into()),
        }
    }

    pub fn is_output(&self) -> bool {
        matches!(self.data, EventData::Output(_))
    }

    pub fn is_marker(&self) -> bool {
        matches!(self.data, EventData::Marker(_))
    }

    /// Parse one event line (`[time, code, data]`).
    pub fn parse(line: &str) -> Result<Self, EventParseError> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        let array = value.as_array().ok_or(EventParseError::NotAnArray)?;
        if array.len() < 3 {
            return Err(EventParseError::TooShort);
        }

        let time = array[0].as_f64().ok_or(EventParseError::BadTime)?;
        if !time.is_finite() || time < 0.0 {
            return Err(EventParseError::BadTime);
        }

        let code = array[1].as_str().ok_or(EventParseError::BadCode)?;
        let payload = array[2].as_str().ok_or(EventParseError::BadPayload)?;

        let data = match code {
            "o" => EventData::Output(payload.to_string()),
            "i" => EventData::Input(payload.to_string()),
            "m" => EventData::Marker(payload.to_string()),
            "r" => {
                let (cols, rows) = parse_resize(payload)
                    .ok_or_else(|| EventParseError::BadResize(payload.to_string()))?;
                EventData::Resize(cols, rows)
            }
            other => return Err(EventParseError::UnknownCode(other.to_string())),
        };

        Ok(Event { time, data })
    }
}

/// Resize payloads are `"COLSxROWS"`, e.g. `"120x40"`.
fn parse_resize(payload: &str) -> Option<(u16, u16)> {
    let (cols, rows) = payload.split_once('x')?;
    let cols = cols.trim().parse().ok()?;
    let rows = rows.trim().parse().ok()?;
    Some((cols, rows))
}

/// Why a single event line failed to parse. Recoverable: the stream skips
/// the line and keeps going, so this only surfaces in logs and skip reports.
#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event is not a JSON array")]
    NotAnArray,
    #[error("event array has fewer than 3 elements")]
    TooShort,
    #[error("event time is not a non-negative number")]
    BadTime,
    #[error("event code is not a string")]
    BadCode,
    #[error("event payload is not a string")]
    BadPayload,
    #[error("unknown event code {0:?}")]
    UnknownCode(String),
    #[error("malformed resize payload {0:?}")]
    BadResize(String),
    #[error("line is not valid UTF-8")]
    Utf8,
}

/// An opened recording: the parsed header plus the means to stream events.
///
/// No reader is held between calls. Every [`events`](Recording::events) call
/// reopens the source from the start, which is what makes the lazy sequence
/// restartable and lets seeking re-read arbitrary ranges of a recording that
/// was never loaded into memory.
#[derive(Debug)]
pub struct Recording {
    path: PathBuf,
    header: Header,
    scanned_duration: OnceCell<f64>,
}

impl Recording {
    /// Open a recording and parse its header.
    ///
    /// Fails on unreadable files and on headers that are missing,
    /// undecodable, short of required fields, or of an unsupported version.
    /// Event lines are not touched here.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CastError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = open_reader(&path)?;

        let mut line = Vec::new();
        reader
            .read_until(b'\n', &mut line)
            .map_err(|source| CastError::Source {
                path: path.clone(),
                source,
            })?;
        if line.is_empty() {
            return Err(CastError::Empty);
        }

        let text = std::str::from_utf8(&line).map_err(|_| CastError::InvalidHeader {
            reason: "header line is not valid UTF-8".to_string(),
        })?;
        let header = parse_header(text)?;
        debug!(
            path = %path.display(),
            width = header.width,
            height = header.height,
            "opened recording"
        );

        Ok(Recording {
            path,
            header,
            scanned_duration: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Fresh lazy event stream positioned at the first event line.
    pub fn events(&self) -> Result<EventStream, CastError> {
        self.open_events(false)
    }

    /// Like [`events`](Recording::events), but for a recording that is still
    /// being written: a final line with no trailing newline is held back
    /// until its newline arrives, instead of being skipped as corrupt.
    pub fn events_tailing(&self) -> Result<EventStream, CastError> {
        self.open_events(true)
    }

    fn open_events(&self, tailing: bool) -> Result<EventStream, CastError> {
        let mut reader = open_reader(&self.path)?;

        // Discard the header line; it was validated at open.
        let mut line = Vec::new();
        reader
            .read_until(b'\n', &mut line)
            .map_err(|source| CastError::Source {
                path: self.path.clone(),
                source,
            })?;

        Ok(EventStream::new(reader, self.path.clone(), tailing))
    }

    /// Lazy iterator over events with time in the half-open window
    /// `[from, to)`.
    pub fn events_between(&self, from: f64, to: f64) -> Result<TimeWindow, CastError> {
        Ok(TimeWindow::new(self.events()?, from, to))
    }

    /// Total duration in seconds: the header's declared duration when
    /// present, otherwise the time of the last event (one streaming scan,
    /// cached). A recording with no events has duration `0.0`.
    pub fn duration(&self) -> Result<f64, CastError> {
        if let Some(declared) = self.header.duration {
            return Ok(declared);
        }
        if let Some(cached) = self.scanned_duration.get() {
            return Ok(*cached);
        }

        let mut last = 0.0_f64;
        let mut events = self.events()?;
        while let Some(event) = events.next_event()? {
            last = event.time;
        }
        let _ = self.scanned_duration.set(last);
        Ok(last)
    }
}

fn parse_header(line: &str) -> Result<Header, CastError> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| CastError::InvalidHeader {
            reason: format!("not a JSON object: {e}"),
        })?;

    // Check the version before the full decode so a header from another
    // major version reports as unsupported rather than as garbage.
    let found = value
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| CastError::InvalidHeader {
            reason: "missing version field".to_string(),
        })?;
    if found != SUPPORTED_VERSION {
        return Err(CastError::UnsupportedVersion { found });
    }

    serde_json::from_value(value).map_err(|e| CastError::InvalidHeader {
        reason: e.to_string(),
    })
}

/// Open the byte source, transparently decompressing gzip. Detection is by
/// content (magic bytes), not by file name.
fn open_reader(path: &Path) -> Result<Box<dyn BufRead>, CastError> {
    let file = File::open(path).map_err(|source| CastError::Source {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buffered = BufReader::new(file);

    let gzipped = buffered
        .fill_buf()
        .map_err(|source| CastError::Source {
            path: path.to_path_buf(),
            source,
        })?
        .starts_with(GZIP_MAGIC);

    if gzipped {
        Ok(Box::new(BufReader::new(GzDecoder::new(buffered))))
    } else {
        Ok(Box::new(buffered))
    }
}
