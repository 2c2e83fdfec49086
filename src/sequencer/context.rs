// Playback context - immutable snapshot of the scheduler state
// Never mutated after construction: every transition builds a successor value

use crate::midi::decoded::DecodedMidi;
use crate::sequencer::action::Action;
use crate::sequencer::deriver::derive_actions;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Scheduler state at one point of a playback run
///
/// Invariants:
/// - `cursor` is `None` (parked, nothing pending) or `Some(i)` with `i <= actions.len()`
/// - every name in `pressed_notes` was pressed by a fired PressKey with no
///   later fired ReleaseKey for that name
/// - `sustain_active` reflects the most recently fired pedal action
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackContext {
    /// Shared between all successors of one loaded file
    pub(crate) actions: Arc<[Action]>,
    pub(crate) pressed_notes: BTreeSet<String>,
    pub(crate) sustain_active: bool,
    pub(crate) cursor: Option<usize>,
    /// Clock reading defining time zero of the current run
    pub(crate) origin: f64,
    pub(crate) paused: bool,
    /// Clock reading at which the run was paused
    pub(crate) paused_at: Option<f64>,
}

impl PlaybackContext {
    /// Fresh context at the start of an action list, running from `now`
    pub fn new(actions: Vec<Action>, now: f64) -> Self {
        Self {
            actions: actions.into(),
            pressed_notes: BTreeSet::new(),
            sustain_active: false,
            cursor: Some(0),
            origin: now,
            paused: false,
            paused_at: None,
        }
    }

    /// Context for a decoded file (an absent file gives an idle, empty context)
    pub fn from_midi(midi: Option<&DecodedMidi>, now: f64) -> Self {
        Self::new(derive_actions(midi), now)
    }

    pub fn empty(now: f64) -> Self {
        Self::new(Vec::new(), now)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn pressed_notes(&self) -> &BTreeSet<String> {
        &self.pressed_notes
    }

    pub fn is_sustain_active(&self) -> bool {
        self.sustain_active
    }

    /// Index of the next unfired action, or None when parked
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn origin(&self) -> f64 {
        self.origin
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Next action to fire, if the cursor points inside the list
    pub fn pending_action(&self) -> Option<&Action> {
        self.cursor.and_then(|index| self.actions.get(index))
    }

    /// True once every action has fired
    pub fn is_finished(&self) -> bool {
        self.cursor == Some(self.actions.len())
    }

    /// Progress as (fired actions, total actions); a parked cursor counts as 0
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor.unwrap_or(0), self.actions.len())
    }

    /// Seconds of the piece consumed at clock reading `now`
    ///
    /// Frozen while paused.
    pub fn elapsed(&self, now: f64) -> f64 {
        let reference = match (self.paused, self.paused_at) {
            (true, Some(paused_at)) => paused_at,
            _ => now,
        };
        reference - self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::action::NoteEvent;

    fn two_actions() -> Vec<Action> {
        vec![
            Action::press_keys(0.0, vec![NoteEvent::new("C4", 60, 0.5)]),
            Action::release_keys(1.0, vec![NoteEvent::new("C4", 60, 0.5)]),
        ]
    }

    #[test]
    fn test_new_context_defaults() {
        let ctx = PlaybackContext::new(two_actions(), 5.0);

        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.cursor(), Some(0));
        assert!(ctx.pressed_notes().is_empty());
        assert!(!ctx.is_sustain_active());
        assert!(!ctx.is_paused());
        assert_eq!(ctx.origin(), 5.0);
        assert_eq!(ctx.pending_action().unwrap().time, 0.0);
        assert_eq!(ctx.progress(), (0, 2));
    }

    #[test]
    fn test_empty_context() {
        let ctx = PlaybackContext::from_midi(None, 0.0);

        assert!(ctx.is_empty());
        assert!(ctx.pending_action().is_none());
        // Nothing to play: already at the end
        assert!(ctx.is_finished());
    }

    #[test]
    fn test_clones_share_actions() {
        let ctx = PlaybackContext::new(two_actions(), 0.0);
        let successor = ctx.clone();
        let other = PlaybackContext::new(two_actions(), 0.0);

        assert!(Arc::ptr_eq(&ctx.actions, &successor.actions));
        assert!(!Arc::ptr_eq(&ctx.actions, &other.actions));
    }

    #[test]
    fn test_elapsed_tracks_clock() {
        let ctx = PlaybackContext::new(two_actions(), 2.0);
        assert_eq!(ctx.elapsed(2.75), 0.75);
    }
}
