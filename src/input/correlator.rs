use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Serialize;

use super::midi::NoteInput;
use crate::notes::Note;

/// A matching key must stay down this long to count as an answer.
pub const MIN_HOLD_MS: i64 = 1000;

/// The key currently held as a correctness candidate.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct PressTracking {
    pub note_number: u8,
    pub pressed_at: DateTime<Utc>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// `response_time_secs` runs from the prompt being played to the key release.
    Correct { response_time_secs: f64 },
    Incorrect,
}

impl Resolution {
    pub fn is_correct(&self) -> bool {
        matches!(self, Resolution::Correct { .. })
    }
}

/// Judges press/release events against the expected note.
///
/// A press of the wrong pitch class fails immediately. A press of the right
/// pitch class (any octave) becomes the candidate, and is judged on its
/// release: held for at least the minimum hold it is correct, otherwise
/// incorrect. Only one candidate is tracked; a newer matching press replaces it.
#[derive(Clone, Debug)]
pub struct InputCorrelator {
    candidate: Option<PressTracking>,
    min_hold: Duration,
}

impl Default for InputCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl InputCorrelator {
    pub fn new() -> Self {
        Self::with_min_hold(Duration::milliseconds(MIN_HOLD_MS))
    }

    pub fn with_min_hold(min_hold: Duration) -> Self {
        InputCorrelator {
            candidate: None,
            min_hold,
        }
    }

    pub fn candidate(&self) -> Option<&PressTracking> {
        self.candidate.as_ref()
    }

    pub fn clear(&mut self) {
        self.candidate = None;
    }

    pub fn handle(
        &mut self,
        input: NoteInput,
        expected: &Note,
        note_started_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<Resolution> {
        if input.is_press {
            if input.note().same_pitch_class(expected) {
                if let Some(prev) = self.candidate {
                    debug!(
                        "candidate {} replaced by {}",
                        prev.note_number, input.note_number
                    );
                }
                self.candidate = Some(PressTracking {
                    note_number: input.note_number,
                    pressed_at: now,
                });
                None
            } else {
                debug!("wrong pitch class {} for {}", input.note(), expected);
                Some(Resolution::Incorrect)
            }
        } else {
            let tracked = self
                .candidate
                .filter(|c| c.note_number == input.note_number)?;
            self.candidate = None;

            let held = now - tracked.pressed_at;
            if held >= self.min_hold {
                let response_time_secs =
                    (now - note_started_at).num_milliseconds() as f64 / 1000.0;
                Some(Resolution::Correct { response_time_secs })
            } else {
                debug!("released after {} ms, too short", held.num_milliseconds());
                Some(Resolution::Incorrect)
            }
        }
    }
}
