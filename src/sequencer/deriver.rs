// Action deriver - turns a decoded MIDI file into the ordered action list
// Runs once per loaded file; pure and deterministic

use crate::midi::decoded::{DecodedMidi, DecodedNote};
use crate::midi::event::{SUSTAIN_CONTROLLER, is_engaged};
use crate::sequencer::action::{Action, NoteEvent};
use std::collections::HashMap;

/// Notes bundled per timestamp, in first-seen order
#[derive(Default)]
struct TimeGroups {
    index: HashMap<u64, usize>,
    groups: Vec<(f64, Vec<NoteEvent>)>,
}

/// Fold -0.0 into 0.0 so both sort and group as the same instant
fn normalize_time(time: f64) -> f64 {
    if time == 0.0 { 0.0 } else { time }
}

impl TimeGroups {
    fn push(&mut self, time: f64, note: &DecodedNote) {
        let time = normalize_time(time);

        let slot = *self.index.entry(time.to_bits()).or_insert_with(|| {
            self.groups.push((time, Vec::new()));
            self.groups.len() - 1
        });

        self.groups[slot].1.push(NoteEvent::new(
            note.pitch_name.clone(),
            note.midi_number,
            note.velocity,
        ));
    }

    fn into_actions(self, build: fn(f64, Vec<NoteEvent>) -> Action) -> impl Iterator<Item = Action> {
        self.groups
            .into_iter()
            .map(move |(time, notes)| build(time, notes))
    }
}

/// Derive the playback action list
///
/// - every note onset shared by several notes becomes one PressKey action
/// - every note offset (onset + duration) likewise becomes one ReleaseKey action
/// - sustain controller changes become pedal actions (0 = release, otherwise press)
///
/// The result is stably sorted by time, then by kind priority. A missing or
/// empty file yields an empty list.
pub fn derive_actions(midi: Option<&DecodedMidi>) -> Vec<Action> {
    let Some(midi) = midi else {
        return Vec::new();
    };

    let mut presses = TimeGroups::default();
    let mut releases = TimeGroups::default();
    let mut pedals = Vec::new();
    let mut skipped = 0usize;

    for track in &midi.tracks {
        for note in &track.notes {
            let offset = note.offset_seconds();
            if !note.onset_seconds.is_finite() || !offset.is_finite() {
                skipped += 1;
                continue;
            }

            presses.push(note.onset_seconds, note);
            releases.push(offset, note);
        }

        for change in track.controller(SUSTAIN_CONTROLLER) {
            if !change.time_seconds.is_finite() {
                skipped += 1;
                continue;
            }
            pedals.push(Action::pedal(
                normalize_time(change.time_seconds),
                is_engaged(change),
            ));
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {} events with non-finite timing", skipped);
    }

    let mut actions: Vec<Action> = presses
        .into_actions(Action::press_keys)
        .chain(releases.into_actions(Action::release_keys))
        .chain(pedals)
        .collect();

    actions.sort_by(Action::playback_order);

    log::debug!(
        "Derived {} actions from {} tracks",
        actions.len(),
        midi.tracks.len()
    );

    actions
}
