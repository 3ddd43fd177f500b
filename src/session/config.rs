use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::notes::{Note, PitchClass};

/// Synthesized voice used to play prompts. Deserializing an unknown name
/// gives piano rather than an error.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(into = "String", from = "String")]
pub enum Instrument {
    #[default]
    Piano,
    Synth,
    Guitar,
}

impl Instrument {
    pub fn name(self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::Synth => "synth",
            Instrument::Guitar => "guitar",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Instrument {
    type Err = std::convert::Infallible;

    /// Unknown voices play as piano.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "piano" => Instrument::Piano,
            "synth" => Instrument::Synth,
            "guitar" => Instrument::Guitar,
            other => {
                warn!("unknown instrument '{}', using piano", other);
                Instrument::Piano
            }
        })
    }
}

impl From<Instrument> for String {
    fn from(instrument: Instrument) -> String {
        instrument.name().to_string()
    }
}

impl From<String> for Instrument {
    fn from(s: String) -> Instrument {
        s.parse().unwrap_or_default()
    }
}

/// Note played when the selection leaves nothing to choose from.
pub fn fallback_note() -> Note {
    Note::new(PitchClass::C, 4)
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    pub instrument: Instrument,
    pub octaves: Vec<i32>,
    pub pitch_classes: Vec<PitchClass>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            instrument: Instrument::Piano,
            octaves: vec![3, 4, 5],
            pitch_classes: PitchClass::NATURALS.to_vec(),
        }
    }
}

impl TrainingConfig {
    /// Every note the selection can produce: pitch classes x octaves,
    /// without duplicates, sorted low to high.
    pub fn possible_notes(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = self
            .octaves
            .iter()
            .flat_map(|&octave| {
                self.pitch_classes
                    .iter()
                    .map(move |&pitch| Note::new(pitch, octave))
            })
            .collect();
        notes.sort();
        notes.dedup();
        notes
    }
}
