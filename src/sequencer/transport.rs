// Transport - pause/resume, seek/scrub and cleanup transitions on the playback context
// Each transition returns a new context; the caller must withdraw any armed step first

use crate::audio::engine::{KeyRelease, SoundEngine};
use crate::midi::pitch::pitch_name_to_midi;
use crate::sequencer::PlaybackError;
use crate::sequencer::context::PlaybackContext;
use std::collections::BTreeSet;

/// Default lead applied when seeking, so the target action is already due
pub const DEFAULT_SEEK_LEAD_SECS: f64 = 0.1;

/// Transport state as shown to the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportState {
    /// Nothing pending: empty list, parked cursor or end of the piece
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackContext {
    pub fn transport_state(&self) -> TransportState {
        if self.pending_action().is_none() {
            TransportState::Stopped
        } else if self.paused {
            TransportState::Paused
        } else {
            TransportState::Playing
        }
    }

    /// Pause (keep the cursor); no sound engine calls
    pub fn pause(&self, now: f64) -> Self {
        if self.paused {
            return self.clone();
        }

        Self {
            paused: true,
            paused_at: Some(now),
            ..self.clone()
        }
    }

    /// Resume, shifting the origin so the paused interval does not count
    pub fn resume(&self, now: f64) -> Self {
        if !self.paused {
            return self.clone();
        }

        let consumed = self.paused_at.map_or(0.0, |paused_at| paused_at - self.origin);

        Self {
            paused: false,
            paused_at: None,
            origin: now - consumed,
            ..self.clone()
        }
    }

    pub fn set_paused(&self, paused: bool, now: f64) -> Self {
        if paused { self.pause(now) } else { self.resume(now) }
    }

    pub fn toggle_paused(&self, now: f64) -> Self {
        self.set_paused(!self.paused, now)
    }

    /// Move the cursor to `target`, re-basing the origin `lead` seconds before it
    ///
    /// Notes and pedal engaged at the old position are left as they are;
    /// use `scrub` (or `clear` first) to release them.
    pub fn seek(&self, target: usize, now: f64, lead: f64) -> Result<Self, PlaybackError> {
        let action = self
            .actions
            .get(target)
            .ok_or(PlaybackError::SeekOutOfRange {
                target,
                len: self.actions.len(),
            })?;

        Ok(Self {
            origin: now - action.time - lead,
            cursor: Some(target),
            paused_at: self.paused.then_some(now),
            ..self.clone()
        })
    }

    /// Release everything engaged and park the cursor
    ///
    /// Calls the engine once per pressed note (MIDI number rebuilt from the
    /// pitch name) and once for the pedal if sustain is active.
    pub fn clear<E>(&self, engine: &mut E, now: f64) -> Self
    where
        E: SoundEngine + ?Sized,
    {
        for name in &self.pressed_notes {
            match pitch_name_to_midi(name) {
                Some(midi_number) => engine.release_key(KeyRelease {
                    pitch_name: Some(name),
                    midi_number,
                }),
                None => log::warn!("Cannot release unknown pitch name '{}'", name),
            }
        }

        if self.sustain_active {
            engine.release_pedal();
        }

        Self {
            pressed_notes: BTreeSet::new(),
            sustain_active: false,
            cursor: None,
            origin: now,
            paused_at: self.paused.then_some(now),
            ..self.clone()
        }
    }

    /// Clear then seek: the jump a scrub bar performs
    pub fn scrub<E>(&self, target: usize, engine: &mut E, now: f64, lead: f64) -> Result<Self, PlaybackError>
    where
        E: SoundEngine + ?Sized,
    {
        if target >= self.actions.len() {
            return Err(PlaybackError::SeekOutOfRange {
                target,
                len: self.actions.len(),
            });
        }

        let cleared = self.clear(engine, now);
        let next = cleared.seek(target, now, lead)?;

        log::info!("Scrubbed to action {}/{}", target, self.actions.len());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::engine::{EngineEvent, RecordingEngine};
    use crate::midi::decoded::{DecodedMidi, DecodedNote, DecodedTrack};
    use crate::sequencer::action::{Action, NoteEvent};
    use crate::sequencer::scheduler::arm;
    use std::time::Duration;

    fn song() -> Vec<Action> {
        vec![
            Action::pedal(0.0, true),
            Action::press_keys(0.0, vec![NoteEvent::new("C4", 60, 0.5)]),
            Action::press_keys(1.0, vec![NoteEvent::new("G4", 67, 0.5)]),
            Action::pedal(2.0, false),
            Action::release_keys(2.0, vec![NoteEvent::new("C4", 60, 0.5)]),
            Action::release_keys(3.0, vec![NoteEvent::new("G4", 67, 0.5)]),
        ]
    }

    fn play_until(ctx: PlaybackContext, cursor: usize, engine: &mut RecordingEngine) -> PlaybackContext {
        let mut ctx = ctx;
        while ctx.cursor() != Some(cursor) {
            let step = arm(&ctx, ctx.origin + 100.0).unwrap();
            ctx = step.fire(&ctx, engine).unwrap();
        }
        ctx
    }

    #[test]
    fn test_transport_states() {
        let ctx = PlaybackContext::new(song(), 0.0);
        assert_eq!(ctx.transport_state(), TransportState::Playing);
        assert_eq!(ctx.pause(0.0).transport_state(), TransportState::Paused);
        assert_eq!(
            PlaybackContext::empty(0.0).transport_state(),
            TransportState::Stopped
        );
        assert_eq!(TransportState::default(), TransportState::Stopped);
    }

    #[test]
    fn test_pause_has_no_side_effects() {
        let ctx = PlaybackContext::new(song(), 0.0);
        let paused = ctx.pause(0.5);

        assert!(paused.is_paused());
        assert_eq!(paused.cursor(), ctx.cursor());
        assert_eq!(paused.origin(), ctx.origin());
        assert!(arm(&paused, 0.5).is_none());
        // Pausing twice keeps the first pause point
        assert_eq!(paused.pause(3.0), paused);
    }

    #[test]
    fn test_resume_excludes_paused_time() {
        let ctx = PlaybackContext::new(song(), 0.0);
        let mut engine = RecordingEngine::new();
        let ctx = play_until(ctx, 2, &mut engine);

        // 0.4s into the piece, pause for 10s
        let paused = ctx.pause(0.4);
        let resumed = paused.resume(10.4);

        assert!(!resumed.is_paused());
        assert!((resumed.origin() - 10.0).abs() < 1e-9);
        assert!((resumed.elapsed(10.4) - 0.4).abs() < 1e-9);

        // The G4 at t=1.0 is still 0.6s away
        let step = arm(&resumed, 10.4).unwrap();
        assert_eq!(step.index(), 2);
        assert!((step.delay().as_secs_f64() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_resume_when_running_is_identity() {
        let ctx = PlaybackContext::new(song(), 1.0);
        assert_eq!(ctx.resume(50.0), ctx);
    }

    #[test]
    fn test_toggle_paused() {
        let ctx = PlaybackContext::new(song(), 0.0);
        let toggled = ctx.toggle_paused(1.0);
        assert!(toggled.is_paused());
        assert!(!toggled.toggle_paused(2.0).is_paused());
    }

    #[test]
    fn test_seek_rebases_origin() {
        let ctx = PlaybackContext::new(song(), 0.0);
        let sought = ctx.seek(2, 20.0, DEFAULT_SEEK_LEAD_SECS).unwrap();

        assert_eq!(sought.cursor(), Some(2));
        assert!((sought.origin() - (20.0 - 1.0 - 0.1)).abs() < 1e-12);

        let step = arm(&sought, 20.0).unwrap();
        assert_eq!(step.index(), 2);
        assert_eq!(step.delay(), Duration::ZERO);
    }

    #[test]
    fn test_seek_out_of_range() {
        let ctx = PlaybackContext::new(song(), 0.0);
        assert_eq!(
            ctx.seek(6, 0.0, 0.1).unwrap_err(),
            PlaybackError::SeekOutOfRange { target: 6, len: 6 }
        );
        assert!(PlaybackContext::empty(0.0).seek(0, 0.0, 0.1).is_err());
    }

    #[test]
    fn test_clear_releases_everything_engaged() {
        let mut engine = RecordingEngine::new();
        let ctx = play_until(PlaybackContext::new(song(), 0.0), 3, &mut engine);
        engine.take();

        let cleared = ctx.clear(&mut engine, 7.0);

        assert_eq!(
            engine.take(),
            vec![
                EngineEvent::ReleaseKey {
                    pitch_name: Some("C4".to_string()),
                    midi_number: 60
                },
                EngineEvent::ReleaseKey {
                    pitch_name: Some("G4".to_string()),
                    midi_number: 67
                },
                EngineEvent::ReleasePedal,
            ]
        );
        assert!(cleared.pressed_notes().is_empty());
        assert!(!cleared.is_sustain_active());
        assert_eq!(cleared.cursor(), None);
        assert_eq!(cleared.origin(), 7.0);
        assert!(arm(&cleared, 7.0).is_none());
    }

    #[test]
    fn test_clear_skips_unmappable_names() {
        let mut engine = RecordingEngine::new();
        let mut ctx = PlaybackContext::new(song(), 0.0);
        ctx.pressed_notes.insert("not-a-pitch".to_string());
        ctx.pressed_notes.insert("A4".to_string());

        ctx.clear(&mut engine, 0.0);
        assert_eq!(
            engine.events(),
            &[EngineEvent::ReleaseKey {
                pitch_name: Some("A4".to_string()),
                midi_number: 69
            }]
        );
    }

    #[test]
    fn test_clear_survives_out_of_range_octave_from_file() {
        let midi = DecodedMidi::new(vec![DecodedTrack {
            notes: vec![
                DecodedNote::new(0.0, 5.0, "C999999999", 60, 0.5),
                DecodedNote::new(0.0, 5.0, "E4", 64, 0.5),
            ],
            ..DecodedTrack::default()
        }]);
        let mut engine = RecordingEngine::new();
        let ctx = PlaybackContext::from_midi(Some(&midi), 0.0);
        let ctx = arm(&ctx, 0.0).unwrap().fire(&ctx, &mut engine).unwrap();
        engine.take();

        let cleared = ctx.clear(&mut engine, 1.0);

        assert_eq!(
            engine.events(),
            &[EngineEvent::ReleaseKey {
                pitch_name: Some("E4".to_string()),
                midi_number: 64
            }]
        );
        assert!(cleared.pressed_notes().is_empty());
    }

    #[test]
    fn test_scrub_then_step_fires_target_immediately() {
        let mut engine = RecordingEngine::new();
        let ctx = play_until(PlaybackContext::new(song(), 0.0), 3, &mut engine);
        engine.take();

        let scrubbed = ctx.scrub(5, &mut engine, 4.0, DEFAULT_SEEK_LEAD_SECS).unwrap();
        assert_eq!(engine.take().len(), 3);

        let step = arm(&scrubbed, 4.0).unwrap();
        assert_eq!(step.index(), 5);
        assert_eq!(step.delay(), Duration::ZERO);

        let done = step.fire(&scrubbed, &mut engine).unwrap();
        assert!(done.is_finished());
        assert!(done.pressed_notes().is_empty());
    }

    #[test]
    fn test_scrub_out_of_range_leaves_engine_untouched() {
        let mut engine = RecordingEngine::new();
        let ctx = play_until(PlaybackContext::new(song(), 0.0), 2, &mut engine);
        engine.take();

        assert!(ctx.scrub(42, &mut engine, 1.0, 0.1).is_err());
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_seek_while_paused_resumes_from_target() {
        let ctx = PlaybackContext::new(song(), 0.0).pause(0.5);
        let sought = ctx.seek(2, 5.0, 0.1).unwrap();
        assert!(sought.is_paused());

        let resumed = sought.resume(9.0);
        let step = arm(&resumed, 9.0).unwrap();
        assert_eq!(step.index(), 2);
        assert_eq!(step.delay(), Duration::ZERO);
        assert!((resumed.elapsed(9.0) - 1.1).abs() < 1e-9);
    }
}
