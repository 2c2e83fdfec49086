// Decoded MIDI model - the already-parsed file handed to the playback core
// Field names follow the JSON produced by common MIDI-to-JSON decoders

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Errors raised while loading a decoded MIDI file
#[derive(Debug, thiserror::Error)]
pub enum MidiLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single note with absolute timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedNote {
    /// Onset in seconds from the start of the piece
    #[serde(rename = "time")]
    pub onset_seconds: f64,

    /// Duration in seconds
    #[serde(rename = "duration")]
    pub duration_seconds: f64,

    /// Pitch name in scientific notation ("C4", "F#3")
    #[serde(rename = "name")]
    pub pitch_name: String,

    /// MIDI note number (0-127)
    #[serde(rename = "midi")]
    pub midi_number: u8,

    /// Normalized velocity (0.0-1.0)
    pub velocity: f32,
}

impl DecodedNote {
    pub fn new(
        onset_seconds: f64,
        duration_seconds: f64,
        pitch_name: impl Into<String>,
        midi_number: u8,
        velocity: f32,
    ) -> Self {
        Self {
            onset_seconds,
            duration_seconds,
            pitch_name: pitch_name.into(),
            midi_number,
            velocity,
        }
    }

    /// Time at which the note stops sounding
    pub fn offset_seconds(&self) -> f64 {
        self.onset_seconds + self.duration_seconds
    }
}

/// A controller change value at a given time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlChange {
    #[serde(rename = "time")]
    pub time_seconds: f64,

    /// Controller value; decoders emit either 0-127 or a normalized 0.0-1.0
    pub value: f32,
}

/// One track of the decoded file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedTrack {
    #[serde(default)]
    pub notes: Vec<DecodedNote>,

    /// Controller changes keyed by controller number (64 = sustain)
    #[serde(default, rename = "controlChanges")]
    pub control_changes: BTreeMap<u8, Vec<ControlChange>>,
}

impl DecodedTrack {
    /// Controller changes for one controller number (empty if absent)
    pub fn controller(&self, number: u8) -> &[ControlChange] {
        self.control_changes
            .get(&number)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Complete decoded file: an ordered list of tracks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedMidi {
    #[serde(default)]
    pub tracks: Vec<DecodedTrack>,
}

impl DecodedMidi {
    pub fn new(tracks: Vec<DecodedTrack>) -> Self {
        Self { tracks }
    }

    /// Parse a decoded file from its JSON representation
    pub fn from_json_str(json: &str) -> Result<Self, MidiLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a decoded JSON file from disk
    pub fn load(path: &Path) -> Result<Self, MidiLoadError> {
        let data = fs::read_to_string(path)?;
        let midi = Self::from_json_str(&data)?;

        log::info!(
            "Loaded {} ({} tracks, {} notes)",
            path.display(),
            midi.tracks.len(),
            midi.note_count()
        );

        Ok(midi)
    }

    /// Total number of notes across all tracks
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|track| track.notes.len()).sum()
    }

    /// True when the file carries neither notes nor controller changes
    pub fn is_empty(&self) -> bool {
        self.tracks
            .iter()
            .all(|track| track.notes.is_empty() && track.control_changes.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"{
        "header": { "name": "ignored" },
        "tracks": [
            {
                "name": "Piano",
                "notes": [
                    { "time": 0.0, "duration": 1.0, "name": "C4", "midi": 60, "velocity": 0.8 },
                    { "time": 0.5, "duration": 0.25, "name": "E4", "midi": 64, "velocity": 0.5 }
                ],
                "controlChanges": {
                    "64": [ { "time": 0.0, "value": 1.0 }, { "time": 1.0, "value": 0.0 } ],
                    "7": [ { "time": 0.0, "value": 0.9 } ]
                }
            },
            { }
        ]
    }"#;

    #[test]
    fn test_parse_decoded_json() {
        let midi = DecodedMidi::from_json_str(SAMPLE_JSON).unwrap();

        assert_eq!(midi.tracks.len(), 2);
        assert_eq!(midi.note_count(), 2);

        let piano = &midi.tracks[0];
        assert_eq!(piano.notes[0].pitch_name, "C4");
        assert_eq!(piano.notes[0].midi_number, 60);
        assert_eq!(piano.notes[1].offset_seconds(), 0.75);
        assert_eq!(piano.controller(64).len(), 2);
        assert_eq!(piano.controller(7).len(), 1);
        assert!(piano.controller(1).is_empty());

        assert!(midi.tracks[1].notes.is_empty());
    }

    #[test]
    fn test_empty_documents() {
        assert!(DecodedMidi::from_json_str("{}").unwrap().is_empty());
        assert!(
            DecodedMidi::from_json_str(r#"{"tracks": [{}]}"#)
                .unwrap()
                .is_empty()
        );
        assert!(!DecodedMidi::from_json_str(SAMPLE_JSON).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let err = DecodedMidi::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, MidiLoadError::Json(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.json");
        std::fs::write(&path, SAMPLE_JSON).unwrap();

        let midi = DecodedMidi::load(&path).unwrap();
        assert_eq!(midi.note_count(), 2);

        let missing = DecodedMidi::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, MidiLoadError::Io(_)));
    }
}
