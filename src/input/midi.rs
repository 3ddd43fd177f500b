use serde::{Deserialize, Serialize};

use crate::notes::{self, Note};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;

/// A key going down or coming up.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteInput {
    pub note_number: u8,
    pub is_press: bool,
}

impl NoteInput {
    pub fn press(note_number: u8) -> Option<Self> {
        (note_number <= 127).then_some(NoteInput {
            note_number,
            is_press: true,
        })
    }

    pub fn release(note_number: u8) -> Option<Self> {
        (note_number <= 127).then_some(NoteInput {
            note_number,
            is_press: false,
        })
    }

    /// Decode a raw MIDI message. Note-on with zero velocity counts as a
    /// release, as most keyboards send it that way. Anything other than
    /// note-on/note-off yields `None`.
    pub fn from_midi(bytes: &[u8]) -> Option<Self> {
        let &[status, note, velocity, ..] = bytes else {
            return None;
        };
        if note > 127 {
            return None;
        }

        match status & 0xF0 {
            NOTE_ON if velocity > 0 => NoteInput::press(note),
            NOTE_ON | NOTE_OFF => NoteInput::release(note),
            _ => None,
        }
    }

    pub fn note(&self) -> Note {
        notes::note_name_of(self.note_number)
    }
}
