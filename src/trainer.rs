use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::input::{InputCorrelator, NoteInput, Resolution};
use crate::notes::Note;
use crate::progress::{self, date_key, DaySummary, LedgerStore, NoteDifficulty, ProgressLedger};
use crate::scoring::{self, ProficiencyBreakdown};
use crate::session::{
    PlaybackSink, Session, SessionState, SessionSummary, TrainingConfig, KEY_ECHO_DURATION_SECS,
    PROMPT_DURATION_SECS,
};

/// Owns every piece of mutable training state. All events go through
/// `&mut self`, so they are applied strictly one after another.
pub struct Trainer<P: PlaybackSink, S: LedgerStore> {
    config: TrainingConfig,
    session: Session,
    correlator: InputCorrelator,
    ledger: ProgressLedger,
    playback: P,
    store: S,
    rng: StdRng,
}

impl<P: PlaybackSink, S: LedgerStore> Trainer<P, S> {
    pub fn new(playback: P, store: S) -> Self {
        Self::with_rng(playback, store, StdRng::from_entropy())
    }

    pub fn with_rng(playback: P, store: S, rng: StdRng) -> Self {
        let ledger = progress::load_or_default(&store);
        Trainer {
            config: TrainingConfig::default(),
            session: Session::new(),
            correlator: InputCorrelator::new(),
            ledger,
            playback,
            store,
            rng,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Change the selection used for scoring and the next session.
    pub fn set_config(&mut self, config: TrainingConfig) {
        self.config = config;
    }

    pub fn session(&self) -> &SessionState {
        self.session.state()
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    pub fn playback(&self) -> &P {
        &self.playback
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Begin a session. A session already running is exited first so its
    /// practice time is kept.
    pub fn start(&mut self, config: TrainingConfig, now: DateTime<Utc>) {
        if self.session.is_active() {
            self.exit(now);
        }
        self.config = config.clone();
        self.correlator.clear();
        let note = self.session.start(config, now, &mut self.rng);
        self.play_prompt(note);
    }

    pub fn exit(&mut self, now: DateTime<Utc>) -> Option<SessionSummary> {
        let summary = self.session.exit(now)?;
        self.correlator.clear();
        self.ledger
            .add_practice_seconds(date_key(now), summary.practiced_secs);
        self.persist();
        Some(summary)
    }

    /// Play the current prompt again. Returns false when there is none.
    pub fn replay(&mut self) -> bool {
        match self.session.replay() {
            Some(note) => {
                self.play_prompt(note);
                true
            }
            None => false,
        }
    }

    /// Run due timers: clears feedback and plays the next prompt when its delay is up.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if let Some(note) = self.session.tick(now, &mut self.rng) {
            self.correlator.clear();
            self.play_prompt(note);
        }
    }

    pub fn handle_midi(&mut self, bytes: &[u8], now: DateTime<Utc>) -> Option<Resolution> {
        match NoteInput::from_midi(bytes) {
            Some(input) => self.handle_input(input, now),
            None => {
                debug!("ignoring MIDI message {:02x?}", bytes);
                None
            }
        }
    }

    /// On-screen keys sound the pressed key before it is judged.
    pub fn press_key(&mut self, note_number: u8, now: DateTime<Utc>) -> Option<Resolution> {
        let input = NoteInput::press(note_number)?;
        self.playback.play_note(
            input.note(),
            self.session.state().instrument,
            KEY_ECHO_DURATION_SECS,
        );
        self.handle_input(input, now)
    }

    pub fn release_key(&mut self, note_number: u8, now: DateTime<Utc>) -> Option<Resolution> {
        let input = NoteInput::release(note_number)?;
        self.handle_input(input, now)
    }

    pub fn handle_input(&mut self, input: NoteInput, now: DateTime<Utc>) -> Option<Resolution> {
        if !self.session.accepts_input() {
            debug!("no prompt awaiting an answer, ignoring {:?}", input);
            return None;
        }
        let state = self.session.state();
        let (expected, note_started_at) = (state.current_note?, state.note_started_at?);

        let resolution = self
            .correlator
            .handle(input, &expected, note_started_at, now)?;

        if let Some(attempt) = self.session.resolve(resolution, now) {
            self.ledger.record_attempt(
                date_key(now),
                attempt.note,
                attempt.correct,
                attempt.retries,
                attempt.response_time_secs,
                now,
            );
            self.persist();
        }
        Some(resolution)
    }

    pub fn score(&self) -> ProficiencyBreakdown {
        scoring::analyze(&self.ledger, &self.config.possible_notes())
    }

    /// Recompute the score and keep it with the saved progress.
    pub fn refresh_score(&mut self) -> ProficiencyBreakdown {
        let breakdown = self.score();
        self.ledger.perfect_pitch_percentage = breakdown.total;
        self.persist();
        breakdown
    }

    pub fn weekly_summary(&self, now: DateTime<Utc>) -> Vec<DaySummary> {
        progress::weekly_summary(&self.ledger, date_key(now))
    }

    pub fn hardest_notes(&self) -> Vec<NoteDifficulty> {
        progress::hardest_notes(&self.ledger)
    }

    /// Erase all saved progress. Asking the user first is up to the caller.
    pub fn reset_progress(&mut self) {
        info!("progress reset");
        self.ledger.reset();
        self.persist();
    }

    fn play_prompt(&mut self, note: Note) {
        self.playback
            .play_note(note, self.session.state().instrument, PROMPT_DURATION_SECS);
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.ledger) {
            warn!("could not save progress: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::PitchClass;
    use crate::progress::MemoryStore;
    use crate::session::Instrument;
    use chrono::{Duration, TimeZone};

    #[derive(Default)]
    struct Recorder {
        played: Vec<(Note, Instrument, f64)>,
    }

    impl PlaybackSink for Recorder {
        fn play_note(&mut self, note: Note, instrument: Instrument, duration_secs: f64) {
            self.played.push((note, instrument, duration_secs));
        }
    }

    struct FailingStore;

    impl LedgerStore for FailingStore {
        fn load(&self) -> crate::error::Result<Option<ProgressLedger>> {
            Err(crate::error::TrainerError::Storage("offline".to_string()))
        }

        fn save(&mut self, _ledger: &ProgressLedger) -> crate::error::Result<()> {
            Err(crate::error::TrainerError::Storage("offline".to_string()))
        }
    }

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn single_note_config() -> TrainingConfig {
        TrainingConfig {
            instrument: Instrument::Guitar,
            octaves: vec![4],
            pitch_classes: vec![PitchClass::E],
        }
    }

    fn trainer() -> Trainer<Recorder, MemoryStore> {
        Trainer::with_rng(
            Recorder::default(),
            MemoryStore::new(),
            StdRng::seed_from_u64(1),
        )
    }

    #[test]
    fn test_start_plays_prompt() {
        let mut tr = trainer();
        tr.start(single_note_config(), t(0));
        assert_eq!(
            tr.playback().played,
            vec![("E4".parse::<Note>().unwrap(), Instrument::Guitar, PROMPT_DURATION_SECS)]
        );
    }

    #[test]
    fn test_input_ignored_without_session() {
        let mut tr = trainer();
        assert_eq!(tr.handle_midi(&[0x90, 64, 90], t(0)), None);
        assert_eq!(tr.ledger(), &ProgressLedger::default());
        assert!(tr.store().blob().is_none());
    }

    #[test]
    fn test_wrong_key_is_recorded_and_saved() {
        let mut tr = trainer();
        tr.start(single_note_config(), t(0));
        let r = tr.handle_midi(&[0x90, 65, 90], t(400));
        assert_eq!(r, Some(Resolution::Incorrect));
        assert_eq!(tr.session().retries, 1);

        let saved = tr.store().load().unwrap().unwrap();
        assert_eq!(saved.total_accuracy().incorrect, 1);
    }

    #[test]
    fn test_on_screen_key_echoes() {
        let mut tr = trainer();
        tr.start(single_note_config(), t(0));
        tr.press_key(52, t(100));
        let (note, instrument, secs) = tr.playback().played[1];
        assert_eq!(note.to_string(), "E3");
        assert_eq!(instrument, Instrument::Guitar);
        assert_eq!(secs, KEY_ECHO_DURATION_SECS);
    }

    #[test]
    fn test_replay_plays_same_note() {
        let mut tr = trainer();
        assert!(!tr.replay());
        tr.start(single_note_config(), t(0));
        assert!(tr.replay());
        let played = &tr.playback().played;
        assert_eq!(played.len(), 2);
        assert_eq!(played[0], played[1]);
    }

    #[test]
    fn test_exit_twice_counts_once() {
        let mut tr = trainer();
        tr.start(single_note_config(), t(0));
        assert_eq!(tr.exit(t(45_400)).unwrap().practiced_secs, 45);
        assert_eq!(tr.exit(t(90_000)), None);
        assert_eq!(tr.ledger().daily_practice[&date_key(t(0))], 45);
    }

    #[test]
    fn test_restart_keeps_practice_time() {
        let mut tr = trainer();
        tr.start(TrainingConfig::default(), t(0));
        tr.start(single_note_config(), t(30_000));
        assert_eq!(tr.config(), &single_note_config());
        assert_eq!(tr.session().session_started_at, Some(t(30_000)));
        assert_eq!(tr.ledger().daily_practice[&date_key(t(0))], 30);

        tr.exit(t(50_000));
        assert_eq!(tr.ledger().daily_practice[&date_key(t(0))], 50);
    }

    #[test]
    fn test_store_failures_are_not_fatal() {
        let mut tr = Trainer::with_rng(
            Recorder::default(),
            FailingStore,
            StdRng::seed_from_u64(3),
        );
        tr.start(single_note_config(), t(0));
        tr.press_key(64, t(100));
        let r = tr.release_key(64, t(1300));
        assert!(r.unwrap().is_correct());
        assert_eq!(tr.ledger().total_accuracy().correct, 1);
    }

    #[test]
    fn test_refresh_score_persists_percentage() {
        let mut tr = trainer();
        tr.set_config(single_note_config());
        let breakdown = tr.refresh_score();
        assert_eq!(tr.ledger().perfect_pitch_percentage, breakdown.total);
        let saved = tr.store().load().unwrap().unwrap();
        assert_eq!(saved.perfect_pitch_percentage, breakdown.total);
    }

    #[test]
    fn test_reset_progress() {
        let mut tr = trainer();
        tr.start(single_note_config(), t(0));
        tr.handle_midi(&[0x90, 60, 90], t(100));
        tr.exit(t(5000));
        tr.reset_progress();
        assert_eq!(tr.ledger(), &ProgressLedger::default());
        assert_eq!(
            tr.store().load().unwrap(),
            Some(ProgressLedger::default())
        );
    }
}
