// Actions - discrete scheduled events (key/pedal press/release) with absolute timing

use crate::sequencer::PlaybackError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A note carried by a key action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch_name: String,

    /// MIDI note number (0-127, where 60 = C4)
    pub midi_number: u8,

    /// Normalized velocity (0.0-1.0)
    pub velocity: f32,
}

impl NoteEvent {
    pub fn new(pitch_name: impl Into<String>, midi_number: u8, velocity: f32) -> Self {
        Self {
            pitch_name: pitch_name.into(),
            midi_number,
            velocity,
        }
    }
}

/// What an action does
///
/// The discriminant is the tie-break priority: at identical timestamps
/// releases resolve before presses, and the pedal before the keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ActionKind {
    ReleaseSustainPedal = 0,
    PressSustainPedal = 1,
    ReleaseKey = 2,
    PressKey = 3,
}

impl ActionKind {
    pub fn priority(self) -> u8 {
        self as u8
    }

    pub fn is_pedal(self) -> bool {
        matches!(
            self,
            ActionKind::ReleaseSustainPedal | ActionKind::PressSustainPedal
        )
    }
}

impl TryFrom<u8> for ActionKind {
    type Error = PlaybackError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ActionKind::ReleaseSustainPedal),
            1 => Ok(ActionKind::PressSustainPedal),
            2 => Ok(ActionKind::ReleaseKey),
            3 => Ok(ActionKind::PressKey),
            other => Err(PlaybackError::UnrecognizedActionKind(other)),
        }
    }
}

impl From<ActionKind> for u8 {
    fn from(kind: ActionKind) -> Self {
        kind.priority()
    }
}

/// A scheduled event at `time` seconds from the start of the piece
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub time: f64,
    pub kind: ActionKind,

    /// Notes for key actions; always empty for pedal actions
    #[serde(default)]
    pub notes: Vec<NoteEvent>,
}

impl Action {
    pub fn press_keys(time: f64, notes: Vec<NoteEvent>) -> Self {
        Self {
            time,
            kind: ActionKind::PressKey,
            notes,
        }
    }

    pub fn release_keys(time: f64, notes: Vec<NoteEvent>) -> Self {
        Self {
            time,
            kind: ActionKind::ReleaseKey,
            notes,
        }
    }

    /// Pedal action: engaged = PressSustainPedal, otherwise ReleaseSustainPedal
    pub fn pedal(time: f64, engaged: bool) -> Self {
        let kind = if engaged {
            ActionKind::PressSustainPedal
        } else {
            ActionKind::ReleaseSustainPedal
        };
        Self {
            time,
            kind,
            notes: Vec::new(),
        }
    }

    /// Total playback order: time ascending, then kind priority ascending
    pub fn playback_order(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

/// Parse an action list previously exported as JSON
pub fn actions_from_json(json: &str) -> Result<Vec<Action>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Export an action list as pretty JSON
pub fn actions_to_json(actions: &[Action]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_priorities() {
        assert_eq!(ActionKind::ReleaseSustainPedal.priority(), 0);
        assert_eq!(ActionKind::PressSustainPedal.priority(), 1);
        assert_eq!(ActionKind::ReleaseKey.priority(), 2);
        assert_eq!(ActionKind::PressKey.priority(), 3);
        assert!(ActionKind::ReleaseSustainPedal < ActionKind::PressKey);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert_eq!(ActionKind::try_from(2).unwrap(), ActionKind::ReleaseKey);

        let err = ActionKind::try_from(7).unwrap_err();
        assert!(matches!(err, PlaybackError::UnrecognizedActionKind(7)));
    }

    #[test]
    fn test_playback_order_ties_break_by_kind() {
        let press = Action::press_keys(1.0, vec![NoteEvent::new("C4", 60, 0.5)]);
        let release = Action::release_keys(1.0, vec![NoteEvent::new("C4", 60, 0.5)]);
        let earlier_press = Action::press_keys(0.5, Vec::new());

        assert_eq!(release.playback_order(&press), Ordering::Less);
        assert_eq!(press.playback_order(&earlier_press), Ordering::Greater);
        assert_eq!(
            Action::pedal(1.0, false).playback_order(&Action::pedal(1.0, true)),
            Ordering::Less
        );
    }

    #[test]
    fn test_pedal_constructor() {
        let down = Action::pedal(0.0, true);
        assert_eq!(down.kind, ActionKind::PressSustainPedal);
        assert!(down.kind.is_pedal());
        assert!(down.notes.is_empty());
        assert_eq!(Action::pedal(0.0, false).kind, ActionKind::ReleaseSustainPedal);
    }

    #[test]
    fn test_json_kind_is_numeric() {
        let json = actions_to_json(&[Action::pedal(0.25, true)]).unwrap();
        assert!(json.contains("\"kind\": 1"));

        let parsed = actions_from_json(&json).unwrap();
        assert_eq!(parsed, vec![Action::pedal(0.25, true)]);
    }

    #[test]
    fn test_json_unknown_kind_fails() {
        let err = actions_from_json(r#"[{"time": 0.0, "kind": 9}]"#).unwrap_err();
        assert!(err.to_string().contains("unrecognized action kind 9"));
    }
}
