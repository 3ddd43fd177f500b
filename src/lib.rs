use chrono::{DateTime, Utc};
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod error;
pub mod input;
pub mod notes;
pub mod progress;
pub mod scoring;
pub mod session;
pub mod trainer;

pub use error::TrainerError;
pub use input::{NoteInput, Resolution};
pub use notes::{Note, PitchClass};
pub use progress::{LedgerStore, ProgressLedger};
pub use scoring::ProficiencyBreakdown;
pub use session::{Instrument, PlaybackSink, SessionState, TrainingConfig};
pub use trainer::Trainer;

#[cfg(target_arch = "wasm32")]
type BrowserStore = progress::LocalStorageStore;
#[cfg(not(target_arch = "wasm32"))]
type BrowserStore = progress::MemoryStore;

/// Route `log` output to the browser console and panics to `console.error`.
#[wasm_bindgen]
pub fn init_logging() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        // a second call finds the logger already installed
        let _ = console_log::init_with_level(log::Level::Info);
    }
}

/// Frequency in Hz of a note name such as "C#4". Unknown names give 440.
#[wasm_bindgen]
pub fn note_frequency(name: &str) -> f64 {
    notes::frequency_of(name)
}

#[wasm_bindgen]
pub fn midi_to_note_name(note_number: u8) -> String {
    notes::note_name_of(note_number).to_string()
}

#[wasm_bindgen]
pub fn note_to_midi(pitch: &str, octave: i32) -> Result<i32, JsValue> {
    let pitch: PitchClass = pitch
        .parse()
        .map_err(|e: TrainerError| JsValue::from_str(&e.to_string()))?;
    notes::hardware_number_of(pitch, octave)
        .ok_or_else(|| JsValue::from_str(&format!("octave {} out of range", octave)))
}

/// Page clock. `Date.now()` gives milliseconds since the epoch.
fn now() -> DateTime<Utc> {
    #[cfg(target_arch = "wasm32")]
    {
        from_js_millis(js_sys::Date::now())
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Utc::now()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn from_js_millis(millis: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis as i64).unwrap_or_else(Utc::now)
}

/// Calls `on_play(note, instrument, durationSecs)` on the page.
struct JsPlayback {
    on_play: js_sys::Function,
}

impl PlaybackSink for JsPlayback {
    fn play_note(&mut self, note: Note, instrument: Instrument, duration_secs: f64) {
        let result = self.on_play.call3(
            &JsValue::NULL,
            &JsValue::from_str(&note.to_string()),
            &JsValue::from_str(instrument.name()),
            &JsValue::from_f64(duration_secs),
        );
        if let Err(e) = result {
            log::warn!("playback callback failed for {}: {:?}", note, e);
        }
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn config_from_js(config: JsValue) -> Result<TrainingConfig, JsValue> {
    if config.is_null() || config.is_undefined() {
        return Ok(TrainingConfig::default());
    }
    serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// The training core as seen from the page. Every method is one event;
/// the page calls `tick()` periodically so delayed prompts and feedback
/// clearing happen.
#[wasm_bindgen]
pub struct WasmTrainer {
    inner: Trainer<JsPlayback, BrowserStore>,
}

#[wasm_bindgen]
impl WasmTrainer {
    #[wasm_bindgen(constructor)]
    pub fn new(on_play: js_sys::Function) -> WasmTrainer {
        WasmTrainer {
            inner: Trainer::new(JsPlayback { on_play }, BrowserStore::default()),
        }
    }

    pub fn set_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        self.inner.set_config(config_from_js(config)?);
        Ok(())
    }

    pub fn config(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.config())
    }

    pub fn start(&mut self, config: JsValue) -> Result<(), JsValue> {
        let config = config_from_js(config)?;
        self.inner.start(config, now());
        Ok(())
    }

    /// Returns the session summary, or null if no session was running.
    pub fn exit(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.exit(now()))
    }

    pub fn replay(&mut self) -> bool {
        self.inner.replay()
    }

    pub fn tick(&mut self) {
        self.inner.tick(now());
    }

    /// Feed a raw MIDI message. Returns the resolution it caused, or null.
    pub fn midi_message(&mut self, data: &[u8]) -> Result<JsValue, JsValue> {
        to_js(&self.inner.handle_midi(data, now()))
    }

    pub fn key_press(&mut self, note_number: u8) -> Result<JsValue, JsValue> {
        to_js(&self.inner.press_key(note_number, now()))
    }

    pub fn key_release(&mut self, note_number: u8) -> Result<JsValue, JsValue> {
        to_js(&self.inner.release_key(note_number, now()))
    }

    pub fn session(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.session())
    }

    pub fn progress(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.ledger())
    }

    /// Recompute the proficiency score, save it, and return the breakdown.
    pub fn score(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.refresh_score())
    }

    pub fn weekly_summary(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.weekly_summary(now()))
    }

    pub fn hardest_notes(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.hardest_notes())
    }

    pub fn reset_progress(&mut self) {
        self.inner.reset_progress();
    }
}
