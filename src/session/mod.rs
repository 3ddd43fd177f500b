//! Training session lifecycle: configuration, the state machine that picks
//! prompts and counts attempts, and the port prompts are played through.

pub mod config;
pub mod state;

pub use config::{fallback_note, Instrument, TrainingConfig};
pub use state::{Attempt, Feedback, Phase, Session, SessionState, SessionSummary};

use crate::notes::Note;

/// How long a prompt note sounds.
pub const PROMPT_DURATION_SECS: f64 = 1.5;
/// How long an on-screen key echoes when pressed.
pub const KEY_ECHO_DURATION_SECS: f64 = 0.5;

/// Sound output. Fire-and-forget: nothing in the session depends on playback finishing.
pub trait PlaybackSink {
    fn play_note(&mut self, note: Note, instrument: Instrument, duration_secs: f64);
}
