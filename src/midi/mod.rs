// MIDI module - decoded file model, pitch names and raw output events

pub mod decoded;
pub mod event;
pub mod pitch;

pub use decoded::{ControlChange, DecodedMidi, DecodedNote, DecodedTrack, MidiLoadError};
pub use event::{MidiEvent, MidiEventTimed, SUSTAIN_CONTROLLER};
pub use pitch::{midi_to_pitch_name, pitch_name_to_midi};
