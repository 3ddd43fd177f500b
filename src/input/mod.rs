//! Note input: the validated event shape delivered by hardware controllers or
//! the on-screen keyboard, and the correlator that judges it against the
//! expected note.

pub mod correlator;
pub mod midi;

pub use correlator::{InputCorrelator, PressTracking, Resolution, MIN_HOLD_MS};
pub use midi::NoteInput;
