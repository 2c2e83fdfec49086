// Scheduler - arms one pending action at a time and fires it into the sound engine
// Exactly one action fires per armed step; the caller re-arms on the successor context

use crate::audio::engine::{KeyPress, KeyRelease, SoundEngine};
use crate::audio::timing::delay_to_duration;
use crate::sequencer::PlaybackError;
use crate::sequencer::action::{Action, ActionKind};
use crate::sequencer::context::PlaybackContext;
use std::sync::Arc;
use std::time::Duration;

/// A single pending timer for the action under the cursor
///
/// The step is a one-shot token: `fire` and `cancel` both consume it,
/// so a stale step can never dispatch twice.
#[derive(Debug)]
#[must_use = "an armed step does nothing until it is fired"]
pub struct ArmedStep {
    actions: Arc<[Action]>,
    index: usize,
    fire_at: f64,
    delay: Duration,
}

/// Arm the action under the cursor
///
/// Returns None when nothing is pending: empty list, parked or finished
/// cursor, or a paused context. The delay is `action.time - (now - origin)`,
/// clamped at zero so overdue actions fire immediately.
pub fn arm(ctx: &PlaybackContext, now: f64) -> Option<ArmedStep> {
    if ctx.paused {
        return None;
    }

    let index = ctx.cursor?;
    let action = ctx.actions.get(index)?;
    let fire_at = ctx.origin + action.time;

    Some(ArmedStep {
        actions: Arc::clone(&ctx.actions),
        index,
        fire_at,
        delay: delay_to_duration(fire_at - now),
    })
}

impl ArmedStep {
    /// Index of the armed action
    pub fn index(&self) -> usize {
        self.index
    }

    /// Clock reading at which the action is due
    pub fn fire_at(&self) -> f64 {
        self.fire_at
    }

    /// Wait measured when the step was armed (zero when overdue)
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Withdraw the step without firing
    pub fn cancel(self) {
        log::trace!("Cancelled step for action {}", self.index);
    }

    /// Dispatch the armed action and return the successor context
    ///
    /// Key actions call the engine once per note and update the pressed set;
    /// pedal actions call the engine once and set the sustain flag.
    pub fn fire<E>(self, ctx: &PlaybackContext, engine: &mut E) -> Result<PlaybackContext, PlaybackError>
    where
        E: SoundEngine + ?Sized,
    {
        if !Arc::ptr_eq(&self.actions, &ctx.actions) || ctx.cursor != Some(self.index) {
            return Err(PlaybackError::StaleStep {
                armed: self.index,
                cursor: ctx.cursor,
            });
        }

        let action = &self.actions[self.index];
        let mut next = ctx.clone();

        match action.kind {
            ActionKind::PressKey => {
                for note in &action.notes {
                    next.pressed_notes.insert(note.pitch_name.clone());
                    engine.press_key(KeyPress {
                        pitch_name: Some(&note.pitch_name),
                        midi_number: note.midi_number,
                        velocity: note.velocity,
                    });
                }
            }
            ActionKind::ReleaseKey => {
                for note in &action.notes {
                    next.pressed_notes.remove(&note.pitch_name);
                    engine.release_key(KeyRelease {
                        pitch_name: Some(&note.pitch_name),
                        midi_number: note.midi_number,
                    });
                }
            }
            ActionKind::PressSustainPedal => {
                next.sustain_active = true;
                engine.press_pedal();
            }
            ActionKind::ReleaseSustainPedal => {
                next.sustain_active = false;
                engine.release_pedal();
            }
        }

        next.cursor = Some(self.index + 1);

        log::debug!(
            "Fired action {}/{} {:?} at t={:.3}s ({} notes)",
            self.index + 1,
            self.actions.len(),
            action.kind,
            action.time,
            action.notes.len()
        );

        Ok(next)
    }
}
