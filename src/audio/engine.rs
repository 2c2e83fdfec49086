// Sound engine sinks - the side-effecting boundary driven by the scheduler
// The synthesizer itself lives outside this crate; these are the calls it receives

use crate::audio::timing::Clock;
use crate::messaging::channels::MidiEventProducer;
use crate::midi::event::{MidiEvent, MidiEventTimed, velocity_to_midi};
use crate::midi::pitch::midi_to_pitch_name;
use ringbuf::traits::Producer;
use std::thread;
use std::time::Duration;

/// Back-off between retries while a release waits for queue space
const RELEASE_RETRY_INTERVAL: Duration = Duration::from_micros(200);

/// Key press request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyPress<'a> {
    pub pitch_name: Option<&'a str>,
    pub midi_number: u8,
    /// Normalized velocity (0.0-1.0)
    pub velocity: f32,
}

/// Key release request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRelease<'a> {
    pub pitch_name: Option<&'a str>,
    pub midi_number: u8,
}

/// Contract of the external instrument
///
/// Pressing an already sounding key retriggers it; releasing a silent key
/// and repeating a pedal state are no-ops on the instrument side.
/// Calls are synchronous: a slow engine delays later actions, never drops them.
pub trait SoundEngine {
    fn press_key(&mut self, key: KeyPress<'_>);
    fn release_key(&mut self, key: KeyRelease<'_>);
    fn press_pedal(&mut self);
    fn release_pedal(&mut self);
}

impl<E: SoundEngine + ?Sized> SoundEngine for &mut E {
    fn press_key(&mut self, key: KeyPress<'_>) {
        (**self).press_key(key);
    }

    fn release_key(&mut self, key: KeyRelease<'_>) {
        (**self).release_key(key);
    }

    fn press_pedal(&mut self) {
        (**self).press_pedal();
    }

    fn release_pedal(&mut self) {
        (**self).release_pedal();
    }
}

impl<E: SoundEngine + ?Sized> SoundEngine for Box<E> {
    fn press_key(&mut self, key: KeyPress<'_>) {
        (**self).press_key(key);
    }

    fn release_key(&mut self, key: KeyRelease<'_>) {
        (**self).release_key(key);
    }

    fn press_pedal(&mut self) {
        (**self).press_pedal();
    }

    fn release_pedal(&mut self) {
        (**self).release_pedal();
    }
}

/// Playback volume, always within [0.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Volume(f32);

impl Volume {
    pub const FULL: Volume = Volume(1.0);

    /// Clamp into range; NaN counts as silence
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Volume(0.0)
        } else {
            Volume(value.clamp(0.0, 1.0))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::FULL
    }
}

/// Binds an engine to a volume: every press velocity is multiplied by it
pub struct VolumeScaled<'a, E: SoundEngine + ?Sized> {
    engine: &'a mut E,
    volume: Volume,
}

impl<'a, E: SoundEngine + ?Sized> VolumeScaled<'a, E> {
    pub fn new(engine: &'a mut E, volume: Volume) -> Self {
        Self { engine, volume }
    }
}

impl<E: SoundEngine + ?Sized> SoundEngine for VolumeScaled<'_, E> {
    fn press_key(&mut self, key: KeyPress<'_>) {
        self.engine.press_key(KeyPress {
            velocity: key.velocity * self.volume.get(),
            ..key
        });
    }

    fn release_key(&mut self, key: KeyRelease<'_>) {
        self.engine.release_key(key);
    }

    fn press_pedal(&mut self) {
        self.engine.press_pedal();
    }

    fn release_pedal(&mut self) {
        self.engine.release_pedal();
    }
}

/// Engine that only logs what it is asked to play
#[derive(Debug, Default)]
pub struct LogEngine;

impl SoundEngine for LogEngine {
    fn press_key(&mut self, key: KeyPress<'_>) {
        let name = key
            .pitch_name
            .map_or_else(|| midi_to_pitch_name(key.midi_number), str::to_owned);
        log::info!(
            "press   {:<4} ({:3}) velocity {:.2}",
            name,
            key.midi_number,
            key.velocity
        );
    }

    fn release_key(&mut self, key: KeyRelease<'_>) {
        let name = key
            .pitch_name
            .map_or_else(|| midi_to_pitch_name(key.midi_number), str::to_owned);
        log::info!("release {:<4} ({:3})", name, key.midi_number);
    }

    fn press_pedal(&mut self) {
        log::info!("pedal down");
    }

    fn release_pedal(&mut self) {
        log::info!("pedal up");
    }
}

/// Owned record of one sink call
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PressKey {
        pitch_name: Option<String>,
        midi_number: u8,
        velocity: f32,
    },
    ReleaseKey {
        pitch_name: Option<String>,
        midi_number: u8,
    },
    PressPedal,
    ReleasePedal,
}

/// Engine that keeps every call, in order
#[derive(Debug, Default, Clone)]
pub struct RecordingEngine {
    events: Vec<EngineEvent>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Drain recorded calls
    pub fn take(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}

impl SoundEngine for RecordingEngine {
    fn press_key(&mut self, key: KeyPress<'_>) {
        self.events.push(EngineEvent::PressKey {
            pitch_name: key.pitch_name.map(str::to_owned),
            midi_number: key.midi_number,
            velocity: key.velocity,
        });
    }

    fn release_key(&mut self, key: KeyRelease<'_>) {
        self.events.push(EngineEvent::ReleaseKey {
            pitch_name: key.pitch_name.map(str::to_owned),
            midi_number: key.midi_number,
        });
    }

    fn press_pedal(&mut self) {
        self.events.push(EngineEvent::PressPedal);
    }

    fn release_pedal(&mut self) {
        self.events.push(EngineEvent::ReleasePedal);
    }
}

/// Engine that renders sink calls as raw MIDI events into a lock-free queue
///
/// When the queue is full, NoteOn and pedal-down events are dropped and
/// counted. NoteOff and pedal-up events wait until the consumer makes room,
/// so a slow consumer can delay playback but never leave a note or the
/// pedal stuck. The consumer must keep draining while the player runs.
pub struct MidiOutEngine<C: Clock> {
    producer: MidiEventProducer,
    clock: C,
    dropped: u64,
}

impl<C: Clock> MidiOutEngine<C> {
    pub fn new(producer: MidiEventProducer, clock: C) -> Self {
        Self {
            producer,
            clock,
            dropped: 0,
        }
    }

    /// Number of events lost to a full queue
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn timed(&self, event: MidiEvent) -> MidiEventTimed {
        MidiEventTimed {
            event,
            time_seconds: self.clock.now(),
        }
    }

    /// Push or drop (press-type events)
    fn emit(&mut self, event: MidiEvent) {
        let timed = self.timed(event);
        if self.producer.try_push(timed).is_err() {
            self.dropped += 1;
            log::warn!("MIDI output queue full, dropped {:?}", event);
        }
    }

    /// Push, waiting for room (release-type events)
    fn emit_release(&mut self, event: MidiEvent) {
        let mut pending = self.timed(event);
        let mut waited = false;

        loop {
            match self.producer.try_push(pending) {
                Ok(()) => break,
                Err(rejected) => {
                    if !waited {
                        log::debug!("MIDI output queue full, waiting to send {:?}", event);
                        waited = true;
                    }
                    pending = rejected;
                    thread::sleep(RELEASE_RETRY_INTERVAL);
                }
            }
        }
    }
}

impl<C: Clock> SoundEngine for MidiOutEngine<C> {
    fn press_key(&mut self, key: KeyPress<'_>) {
        // Silent at zero volume; the matching NoteOff is still sent and harmless
        if key.velocity.is_nan() || key.velocity <= 0.0 {
            log::trace!("Skipping silent press of {}", key.midi_number);
            return;
        }
        self.emit(MidiEvent::NoteOn {
            note: key.midi_number,
            velocity: velocity_to_midi(key.velocity),
        });
    }

    fn release_key(&mut self, key: KeyRelease<'_>) {
        self.emit_release(MidiEvent::NoteOff {
            note: key.midi_number,
        });
    }

    fn press_pedal(&mut self) {
        self.emit(MidiEvent::sustain(true));
    }

    fn release_pedal(&mut self) {
        self.emit_release(MidiEvent::sustain(false));
    }
}
