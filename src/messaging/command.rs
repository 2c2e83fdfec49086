// Command types - presentation/transport caller → player thread

use crate::sequencer::action::Action;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the loaded piece with a freshly derived action list
    Load(Vec<Action>),
    SetPaused(bool),
    TogglePause,
    /// Jump to an action index (releases whatever is engaged first)
    Seek(usize),
    /// Volume multiplier; clamped to [0, 1] by the player
    SetVolume(f32),
    /// Release everything and end the player thread
    Stop,
}
