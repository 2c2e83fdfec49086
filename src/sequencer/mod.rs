// Sequencer module - action derivation, playback context and scheduling
// Everything here is clock-agnostic: the current time is always passed in

pub mod action;
pub mod context;
pub mod deriver;
pub mod player;
pub mod scheduler;
pub mod transport;

pub use action::{Action, ActionKind, NoteEvent};
pub use context::PlaybackContext;
pub use deriver::derive_actions;
pub use player::{PlaybackStatus, Player};
pub use scheduler::{ArmedStep, arm};
pub use transport::{DEFAULT_SEEK_LEAD_SECS, TransportState};

use thiserror::Error;

/// Playback error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// Derivation and dispatch disagree about the set of action kinds
    #[error("unrecognized action kind {0}")]
    UnrecognizedActionKind(u8),

    #[error("seek target {target} out of range (action list has {len} actions)")]
    SeekOutOfRange { target: usize, len: usize },

    /// A step armed for one cursor position was fired against another
    #[error("step armed for action {armed} fired at cursor {cursor:?}")]
    StaleStep { armed: usize, cursor: Option<usize> },

    #[error("player thread is no longer running")]
    PlayerDisconnected,
}
