//! Integration tests for opening and streaming recordings.

use seekcast::{CastError, Event, EventData, Recording};
use tempfile::TempDir;

use crate::helpers::{write_cast, write_cast_gz, BASIC_HEADER};

// ============================================================================
// Opening and header validation
// ============================================================================

#[test]
fn open_parses_header_and_leaves_events_alone() {
    let dir = TempDir::new().unwrap();
    let path = write_cast(
        &dir,
        "basic.cast",
        r#"{"version": 2, "width": 120, "height": 40, "title": "demo"}"#,
        &[r#"[0.5, "o", "hi"]"#],
    );

    let recording = Recording::open(&path).unwrap();
    assert_eq!(recording.header().width, 120);
    assert_eq!(recording.header().height, 40);
    assert_eq!(recording.header().title.as_deref(), Some("demo"));
    assert_eq!(recording.path(), path.as_path());
}

#[test]
fn open_missing_file_reports_source_error() {
    let dir = TempDir::new().unwrap();
    let err = Recording::open(dir.path().join("nope.cast")).unwrap_err();
    assert!(matches!(err, CastError::Source { .. }));
}

#[test]
fn open_empty_file_reports_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.cast");
    std::fs::write(&path, "").unwrap();

    let err = Recording::open(&path).unwrap_err();
    assert!(matches!(err, CastError::Empty));
}

#[test]
fn open_garbage_header_reports_invalid() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.cast");
    std::fs::write(&path, "not a header at all\n").unwrap();

    let err = Recording::open(&path).unwrap_err();
    assert!(matches!(err, CastError::InvalidHeader { .. }));
}

#[test]
fn open_v3_recording_reports_unsupported_version() {
    let dir = TempDir::new().unwrap();
    let path = write_cast(
        &dir,
        "v3.cast",
        r#"{"version": 3, "term": {"cols": 80, "rows": 24}}"#,
        &[],
    );

    let err = Recording::open(&path).unwrap_err();
    assert!(matches!(err, CastError::UnsupportedVersion { found: 3 }));
}

// ============================================================================
// Gzip handling
// ============================================================================

#[test]
fn gzipped_recording_reads_transparently() {
    let dir = TempDir::new().unwrap();
    let path = write_cast_gz(
        &dir,
        "compressed.cast.gz",
        BASIC_HEADER,
        &[r#"[0.5, "o", "zipped"]"#, r#"[1.0, "o", "!"]"#],
    );

    let recording = Recording::open(&path).unwrap();
    let events: Vec<Event> = recording.events().unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].data, EventData::Output("zipped".to_string()));
    assert_eq!(recording.duration().unwrap(), 1.0);
}

#[test]
fn gzip_detection_is_by_content_not_name() {
    let dir = TempDir::new().unwrap();
    // Plain text despite the .gz name.
    let path = write_cast(&dir, "misnamed.cast.gz", BASIC_HEADER, &[r#"[0.5, "o", "x"]"#]);

    let recording = Recording::open(&path).unwrap();
    assert_eq!(recording.events().unwrap().count(), 1);
}

// ============================================================================
// Lazy streaming and corruption resilience
// ============================================================================

#[test]
fn events_stream_in_file_order() {
    let dir = TempDir::new().unwrap();
    let path = write_cast(
        &dir,
        "ordered.cast",
        BASIC_HEADER,
        &[
            r#"[0.0, "o", "a"]"#,
            r#"[0.5, "i", "ls\r"]"#,
            r#"[1.0, "m", "checkpoint"]"#,
            r#"[1.5, "r", "100x30"]"#,
        ],
    );

    let recording = Recording::open(path).unwrap();
    let events: Vec<Event> = recording.events().unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(events[1].data, EventData::Input("ls\r".to_string()));
    assert_eq!(events[2].data, EventData::Marker("checkpoint".to_string()));
    assert_eq!(events[3].data, EventData::Resize(100, 30));
}

#[test]
fn events_can_be_streamed_again_from_the_start() {
    let dir = TempDir::new().unwrap();
    let path = write_cast(
        &dir,
        "restart.cast",
        BASIC_HEADER,
        &[r#"[0.5, "o", "a"]"#, r#"[1.0, "o", "b"]"#],
    );
    let recording = Recording::open(path).unwrap();

    assert_eq!(recording.events().unwrap().count(), 2);
    // A second stream starts over; nothing was consumed from the recording.
    assert_eq!(recording.events().unwrap().count(), 2);
}

#[test]
fn tailing_stream_matches_plain_streaming_on_a_complete_file() {
    let dir = TempDir::new().unwrap();
    let path = write_cast(
        &dir,
        "complete.cast",
        BASIC_HEADER,
        &[r#"[0.5, "o", "a"]"#, r#"[1.0, "o", "b"]"#],
    );
    let recording = Recording::open(path).unwrap();

    let plain: Vec<Event> = recording.events().unwrap().collect::<Result<_, _>>().unwrap();
    let tailing: Vec<Event> = recording
        .events_tailing()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(plain, tailing);
}

#[test]
fn corrupt_line_is_skipped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let mut lines = vec![
        r#"[0.1, "o", "1"]"#,
        r#"[0.2, "o", "2"]"#,
        r#"[0.3, "o", "3"]"#,
        r#"[0.4, "o", "4"]"#,
        "{{{ definitely not an event",
        r#"[0.6, "o", "6"]"#,
        r#"[0.7, "o", "7"]"#,
        r#"[0.8, "o", "8"]"#,
        r#"[0.9, "o", "9"]"#,
        r#"[1.0, "o", "10"]"#,
    ];
    let path = write_cast(&dir, "corrupt.cast", BASIC_HEADER, &lines);
    let recording = Recording::open(path).unwrap();

    let mut stream = recording.events().unwrap();
    let mut events = Vec::new();
    while let Some(event) = stream.next_event().unwrap() {
        events.push(event);
    }

    assert_eq!(events.len(), 9);
    assert_eq!(stream.skipped_count(), 1);
    // Header is line 1, so the corrupt fifth event line is file line 6.
    assert_eq!(stream.skipped_lines(), &[6]);

    // Events after the corrupt line still arrive.
    lines.remove(4);
    let times: Vec<f64> = events.iter().map(|e| e.time).collect();
    assert_eq!(times.len(), lines.len());
    assert_eq!(*times.last().unwrap(), 1.0);
}

#[test]
fn truncated_final_line_is_treated_as_corrupt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("truncated.cast");
    std::fs::write(
        &path,
        format!("{BASIC_HEADER}\n[0.5, \"o\", \"complete\"]\n[1.0, \"o\", \"cut off"),
    )
    .unwrap();

    let recording = Recording::open(&path).unwrap();
    let mut stream = recording.events().unwrap();
    let mut events = Vec::new();
    while let Some(event) = stream.next_event().unwrap() {
        events.push(event);
    }

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, EventData::Output("complete".to_string()));
    assert_eq!(stream.skipped_count(), 1);
}

// ============================================================================
// Duration
// ============================================================================

#[test]
fn declared_duration_wins_over_scanning() {
    let dir = TempDir::new().unwrap();
    let path = write_cast(
        &dir,
        "declared.cast",
        r#"{"version": 2, "width": 80, "height": 24, "duration": 12.5}"#,
        &[r#"[0.5, "o", "a"]"#],
    );

    let recording = Recording::open(path).unwrap();
    assert_eq!(recording.duration().unwrap(), 12.5);
}

#[test]
fn duration_scans_to_the_last_event_when_undeclared() {
    let dir = TempDir::new().unwrap();
    let path = write_cast(
        &dir,
        "scan.cast",
        BASIC_HEADER,
        &[r#"[0.5, "o", "a"]"#, r#"[1.0, "o", "b"]"#, r#"[2.0, "o", "c"]"#],
    );

    let recording = Recording::open(path).unwrap();
    assert_eq!(recording.duration().unwrap(), 2.0);
    // Second call hits the cache; same answer either way.
    assert_eq!(recording.duration().unwrap(), 2.0);
}

#[test]
fn recording_without_events_has_zero_duration() {
    let dir = TempDir::new().unwrap();
    let path = write_cast(&dir, "bare.cast", BASIC_HEADER, &[]);

    let recording = Recording::open(path).unwrap();
    assert_eq!(recording.duration().unwrap(), 0.0);
}

// ============================================================================
// Time windows
// ============================================================================

#[test]
fn events_between_is_half_open() {
    let dir = TempDir::new().unwrap();
    let path = write_cast(
        &dir,
        "window.cast",
        BASIC_HEADER,
        &[
            r#"[0.0, "o", "a"]"#,
            r#"[0.5, "o", "b"]"#,
            r#"[1.0, "o", "c"]"#,
            r#"[1.5, "o", "d"]"#,
        ],
    );
    let recording = Recording::open(path).unwrap();

    let until: Vec<Event> = recording
        .events_between(0.0, 0.7)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(until.len(), 2);

    let from: Vec<Event> = recording
        .events_between(1.0, f64::INFINITY)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let times: Vec<f64> = from.iter().map(|e| e.time).collect();
    assert_eq!(times, vec![1.0, 1.5]);
}

#[test]
fn events_between_empty_window_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_cast(
        &dir,
        "empty_window.cast",
        BASIC_HEADER,
        &[r#"[0.5, "o", "a"]"#],
    );
    let recording = Recording::open(path).unwrap();

    assert_eq!(recording.events_between(0.5, 0.5).unwrap().count(), 0);
    assert_eq!(recording.events_between(3.0, 9.0).unwrap().count(), 0);
}
