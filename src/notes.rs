use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::TrainerError;

pub const A4_HZ: f64 = 440.0;

const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(into = "String", try_from = "String")]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// The natural pitch classes, i.e. the white keys.
    pub const NATURALS: [PitchClass; 7] = [
        PitchClass::C,
        PitchClass::D,
        PitchClass::E,
        PitchClass::F,
        PitchClass::G,
        PitchClass::A,
        PitchClass::B,
    ];

    /// Semitones above C.
    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        PITCH_NAMES[self as usize]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PITCH_NAMES
            .iter()
            .position(|name| *name == s)
            .map(|i| PitchClass::ALL[i])
            .ok_or_else(|| TrainerError::InvalidNote(s.to_string()))
    }
}

impl From<PitchClass> for String {
    fn from(pitch: PitchClass) -> String {
        pitch.name().to_string()
    }
}

impl TryFrom<String> for PitchClass {
    type Error = TrainerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A pitch class in a specific octave, written `"<PitchClass><Octave>"` (e.g. `"C#4"`).
/// Ordered by octave first so collections of notes sort low to high.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(into = "String", try_from = "String")]
pub struct Note {
    pub octave: i32,
    pub pitch: PitchClass,
}

impl Note {
    pub fn new(pitch: PitchClass, octave: i32) -> Self {
        Note { octave, pitch }
    }

    /// Equal-tempered frequency with A4 = 440 Hz. `None` when the octave is
    /// too far out for the result to be a finite number.
    pub fn frequency(&self) -> Option<f64> {
        let semitones_from_a4 = self
            .octave
            .checked_sub(4)?
            .checked_mul(12)?
            .checked_add(self.pitch.index() - PitchClass::A.index())?;
        let hz = A4_HZ * 2f64.powf(semitones_from_a4 as f64 / 12.0);
        (hz.is_finite() && hz > 0.0).then_some(hz)
    }

    /// Octave-independent comparison; this is what identification is judged on.
    pub fn same_pitch_class(&self, other: &Note) -> bool {
        self.pitch == other.pitch
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch, self.octave)
    }
}

impl FromStr for Note {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .char_indices()
            .skip(1)
            .find(|(_, c)| c.is_ascii_digit() || *c == '-')
            .map(|(i, _)| i)
            .ok_or_else(|| TrainerError::InvalidNote(s.to_string()))?;

        let pitch: PitchClass = s[..split]
            .parse()
            .map_err(|_| TrainerError::InvalidNote(s.to_string()))?;
        let octave: i32 = s[split..]
            .parse()
            .map_err(|_| TrainerError::InvalidNote(s.to_string()))?;

        Ok(Note::new(pitch, octave))
    }
}

impl From<Note> for String {
    fn from(note: Note) -> String {
        note.to_string()
    }
}

impl TryFrom<String> for Note {
    type Error = TrainerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Frequency of a note given by name. Unrecognized names and octaves
/// outside the representable range fall back to A4.
pub fn frequency_of(name: &str) -> f64 {
    match name.parse::<Note>() {
        Ok(note) => note.frequency().unwrap_or_else(|| {
            warn!("octave of {} out of range, falling back to A4", note);
            A4_HZ
        }),
        Err(e) => {
            warn!("{}, falling back to A4", e);
            A4_HZ
        }
    }
}

pub fn pitch_class_of(note_number: u8) -> PitchClass {
    PitchClass::ALL[(note_number % 12) as usize]
}

/// MIDI numbering puts note 0 at C-1, so middle C (60) is C4.
pub fn note_name_of(note_number: u8) -> Note {
    Note::new(pitch_class_of(note_number), note_number as i32 / 12 - 1)
}

/// `None` when the octave is so large the number does not fit an `i32`.
pub fn hardware_number_of(pitch: PitchClass, octave: i32) -> Option<i32> {
    octave
        .checked_add(1)?
        .checked_mul(12)?
        .checked_add(pitch.index())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(s: &str) -> Note {
        s.parse().unwrap()
    }

    #[test]
    fn test_frequency_reference_points() {
        assert_eq!(frequency_of("A4"), 440.0);
        assert!((frequency_of("A5") - 880.0).abs() < 1e-9);
        assert!((frequency_of("C4") - 261.63).abs() < 0.01);
        assert!((frequency_of("A3") - 220.0).abs() < 1e-9);
    }

    #[test]
    fn test_frequency_unknown_pitch_falls_back_to_a4() {
        assert_eq!(frequency_of("H4"), A4_HZ);
        assert_eq!(frequency_of("Cb4"), A4_HZ);
        assert_eq!(frequency_of(""), A4_HZ);
        assert_eq!(frequency_of("C"), A4_HZ);
    }

    #[test]
    fn test_hardware_number_roundtrip() {
        for octave in 0..=8 {
            for pitch in PitchClass::ALL {
                let n = hardware_number_of(pitch, octave).unwrap();
                let back = note_name_of(n as u8);
                assert_eq!(back, Note::new(pitch, octave));
                assert_eq!(pitch_class_of(n as u8), pitch);
            }
        }
    }

    #[test]
    fn test_hardware_number_reference_points() {
        assert_eq!(hardware_number_of(PitchClass::C, 4), Some(60));
        assert_eq!(hardware_number_of(PitchClass::A, 4), Some(69));
        assert_eq!(hardware_number_of(PitchClass::C, -1), Some(0));
        assert_eq!(note_name_of(127), note("G9"));
        assert_eq!(note_name_of(0), note("C-1"));
    }

    #[test]
    fn test_huge_octaves_do_not_overflow() {
        assert_eq!(frequency_of("C999999999"), A4_HZ);
        assert_eq!(frequency_of("C-999999999"), A4_HZ);
        assert_eq!(frequency_of("A2000"), A4_HZ);
        assert_eq!(note("C999999999").frequency(), None);
        assert_eq!(hardware_number_of(PitchClass::C, i32::MAX), None);
        assert_eq!(hardware_number_of(PitchClass::B, i32::MAX / 12 + 1), None);
        assert_eq!(hardware_number_of(PitchClass::C, 10), Some(132));
    }

    #[test]
    fn test_parse_and_display() {
        let n = note("C#4");
        assert_eq!(n.pitch, PitchClass::CSharp);
        assert_eq!(n.octave, 4);
        assert_eq!(n.to_string(), "C#4");
        assert!("X4".parse::<Note>().is_err());
        assert!("C#".parse::<Note>().is_err());
        assert!("C#x".parse::<Note>().is_err());
    }

    #[test]
    fn test_same_pitch_class_ignores_octave() {
        assert!(note("E2").same_pitch_class(&note("E6")));
        assert!(!note("E4").same_pitch_class(&note("F4")));
    }

    #[test]
    fn test_note_serializes_as_name() {
        let json = serde_json::to_string(&note("F#3")).unwrap();
        assert_eq!(json, "\"F#3\"");
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note("F#3"));
        assert!(serde_json::from_str::<Note>("\"Q3\"").is_err());
    }

    #[test]
    fn test_notes_sort_low_to_high() {
        let mut notes = vec![note("C5"), note("B4"), note("C4")];
        notes.sort();
        assert_eq!(notes, vec![note("C4"), note("B4"), note("C5")]);
    }
}
