// MIDI event types - raw channel messages emitted towards an external instrument

use crate::midi::decoded::ControlChange;

/// Sustain pedal controller number (damper pedal)
pub const SUSTAIN_CONTROLLER: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    ControlChange { controller: u8, value: u8 },
}

/// MIDI event stamped with the clock reading at which it was emitted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiEventTimed {
    pub event: MidiEvent,
    pub time_seconds: f64,
}

impl MidiEvent {
    /// Sustain pedal down (127) or up (0)
    pub fn sustain(engaged: bool) -> Self {
        MidiEvent::ControlChange {
            controller: SUSTAIN_CONTROLLER,
            value: if engaged { 127 } else { 0 },
        }
    }

    /// Encode as a raw 3-byte MIDI message on the given channel (0-15)
    pub fn to_bytes(&self, channel: u8) -> [u8; 3] {
        let channel = channel & 0x0F;

        match *self {
            MidiEvent::NoteOn { note, velocity } => [0x90 | channel, note & 0x7F, velocity & 0x7F],
            MidiEvent::NoteOff { note } => [0x80 | channel, note & 0x7F, 0],
            MidiEvent::ControlChange { controller, value } => {
                [0xB0 | channel, controller & 0x7F, value & 0x7F]
            }
        }
    }
}

/// Convert a normalized velocity (0.0-1.0) into a MIDI velocity (1-127)
///
/// A sounding note never gets velocity 0, which receivers treat as Note Off.
pub fn velocity_to_midi(velocity: f32) -> u8 {
    if !velocity.is_finite() {
        return 1;
    }
    ((velocity.clamp(0.0, 1.0) * 127.0).round() as u8).max(1)
}

/// True when a controller value means "engaged"
///
/// Only an exact zero releases the pedal, whatever scale the decoder used.
pub fn is_engaged(change: &ControlChange) -> bool {
    change.value != 0.0
}
