// Pianola - MIDI performance playback core, library exports for the binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod messaging;
pub mod midi;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use audio::engine::{KeyPress, KeyRelease, SoundEngine, Volume, VolumeScaled};
pub use audio::timing::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, PlayerConfig};
pub use messaging::{Command, Notification};
pub use midi::{DecodedMidi, MidiEvent, MidiLoadError};
pub use sequencer::{
    Action, ActionKind, ArmedStep, NoteEvent, PlaybackContext, PlaybackError, PlaybackStatus,
    Player, TransportState, arm, derive_actions,
};
