//! Marker collection for navigation.
//!
//! Markers are annotation events in the cast file that can be used to jump
//! to specific points in the recording.

use crate::asciicast::{CastError, EventData, Recording};
use crate::player::state::MarkerPosition;

/// Collect all markers from the recording with their absolute times.
///
/// Streams through the whole recording once, so call it when the recording
/// is opened rather than per frame. Returned markers are in recording
/// order, which for a well-formed file means sorted by time.
pub fn collect_markers(recording: &Recording) -> Result<Vec<MarkerPosition>, CastError> {
    let mut markers = Vec::new();
    let mut events = recording.events()?;
    while let Some(event) = events.next_event()? {
        if let EventData::Marker(label) = event.data {
            markers.push(MarkerPosition {
                time: event.time,
                label,
            });
        }
    }
    Ok(markers)
}
