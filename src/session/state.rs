use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::config::{fallback_note, Instrument, TrainingConfig};
use crate::input::Resolution;
use crate::notes::Note;

/// Pause after a correct answer before the next prompt, so the feedback is seen.
pub const ADVANCE_DELAY_MS: i64 = 1000;
pub const FEEDBACK_CLEAR_MS: i64 = 1500;

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Inactive,
    AwaitingIdentification,
    /// Answered correctly; the next note is scheduled.
    BetweenNotes,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Feedback {
    Correct { note: Note },
    Incorrect,
}

/// One resolved attempt, in the shape the ledger records it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attempt {
    pub note: Note,
    pub correct: bool,
    pub retries: u32,
    pub response_time_secs: f64,
}

/// What a finished session amounted to.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct SessionSummary {
    pub practiced_secs: u64,
    pub correct_guesses: u32,
    pub incorrect_guesses: u32,
}

/// Read-only view of the running session, handed to the page for rendering.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct SessionState {
    pub active: bool,
    pub phase: Phase,
    pub instrument: Instrument,
    pub current_note: Option<Note>,
    pub note_started_at: Option<DateTime<Utc>>,
    pub session_started_at: Option<DateTime<Utc>>,
    /// Failed attempts on the current note.
    pub retries: u32,
    pub correct_guesses: u32,
    pub incorrect_guesses: u32,
    pub feedback: Option<Feedback>,
}

#[derive(Clone, Debug, Default)]
pub struct Session {
    state: SessionState,
    config: TrainingConfig,
    advance_at: Option<DateTime<Utc>>,
    feedback_until: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Only a sounding, unanswered prompt takes input.
    pub fn accepts_input(&self) -> bool {
        self.state.phase == Phase::AwaitingIdentification
    }

    pub fn start<R: Rng + ?Sized>(
        &mut self,
        config: TrainingConfig,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Note {
        info!(
            "session started: {} over {} notes",
            config.instrument,
            config.possible_notes().len()
        );
        self.state = SessionState {
            active: true,
            instrument: config.instrument,
            session_started_at: Some(now),
            ..SessionState::default()
        };
        self.config = config;
        self.advance_at = None;
        self.feedback_until = None;

        let note = pick_note(&self.config, rng);
        self.present(note, now);
        note
    }

    /// Move to a new random prompt. Returns the note to play, or `None`
    /// when the session is no longer active.
    pub fn advance<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> Option<Note> {
        if !self.state.active {
            return None;
        }
        let note = pick_note(&self.config, rng);
        self.present(note, now);
        Some(note)
    }

    fn present(&mut self, note: Note, now: DateTime<Utc>) {
        self.state.current_note = Some(note);
        self.state.note_started_at = Some(now);
        self.state.retries = 0;
        self.state.phase = Phase::AwaitingIdentification;
        self.advance_at = None;
    }

    /// Apply a correlator verdict. Returns the attempt to record, or `None`
    /// when no prompt is awaiting an answer.
    pub fn resolve(&mut self, resolution: Resolution, now: DateTime<Utc>) -> Option<Attempt> {
        if !self.accepts_input() {
            return None;
        }
        let note = self.state.current_note?;

        let attempt = match resolution {
            Resolution::Correct { response_time_secs } => {
                self.state.correct_guesses += 1;
                self.state.phase = Phase::BetweenNotes;
                self.state.feedback = Some(Feedback::Correct { note });
                self.advance_at = Some(now + Duration::milliseconds(ADVANCE_DELAY_MS));
                Attempt {
                    note,
                    correct: true,
                    retries: self.state.retries,
                    response_time_secs,
                }
            }
            Resolution::Incorrect => {
                self.state.incorrect_guesses += 1;
                self.state.retries += 1;
                self.state.feedback = Some(Feedback::Incorrect);
                Attempt {
                    note,
                    correct: false,
                    retries: 0,
                    response_time_secs: 0.0,
                }
            }
        };
        self.feedback_until = Some(now + Duration::milliseconds(FEEDBACK_CLEAR_MS));
        Some(attempt)
    }

    /// Fire whatever is due. Returns the next prompt if a pending advance fired.
    pub fn tick<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> Option<Note> {
        if self.feedback_until.is_some_and(|at| now >= at) {
            self.feedback_until = None;
            self.state.feedback = None;
        }

        match self.advance_at {
            Some(at) if now >= at => {
                self.advance_at = None;
                self.advance(now, rng)
            }
            _ => None,
        }
    }

    /// The prompt to play again; timing and retries are left untouched.
    pub fn replay(&self) -> Option<Note> {
        if self.state.active {
            self.state.current_note
        } else {
            None
        }
    }

    /// End the session. A second call without a new `start` is a no-op.
    pub fn exit(&mut self, now: DateTime<Utc>) -> Option<SessionSummary> {
        if !self.state.active {
            return None;
        }
        let elapsed_secs = self
            .state
            .session_started_at
            .map(|start| (now - start).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        let summary = SessionSummary {
            practiced_secs: elapsed_secs.max(0.0).round() as u64,
            correct_guesses: self.state.correct_guesses,
            incorrect_guesses: self.state.incorrect_guesses,
        };
        info!(
            "session ended after {}s: {} correct, {} incorrect",
            summary.practiced_secs, summary.correct_guesses, summary.incorrect_guesses
        );

        self.state = SessionState {
            instrument: self.state.instrument,
            ..SessionState::default()
        };
        self.advance_at = None;
        self.feedback_until = None;
        Some(summary)
    }
}

fn pick_note<R: Rng + ?Sized>(config: &TrainingConfig, rng: &mut R) -> Note {
    match config.possible_notes().choose(rng) {
        Some(note) => *note,
        None => {
            warn!("empty note selection, falling back to {}", fallback_note());
            fallback_note()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::PitchClass;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn started() -> (Session, StdRng) {
        let mut rng = rng();
        let mut session = Session::new();
        session.start(TrainingConfig::default(), t(0), &mut rng);
        (session, rng)
    }

    #[test]
    fn test_start_sets_up_first_prompt() {
        let (session, _) = started();
        let state = session.state();
        assert!(state.active);
        assert_eq!(state.phase, Phase::AwaitingIdentification);
        assert_eq!(state.session_started_at, Some(t(0)));
        assert_eq!(state.note_started_at, Some(t(0)));
        assert!(TrainingConfig::default()
            .possible_notes()
            .contains(&state.current_note.unwrap()));
    }

    #[test]
    fn test_picks_stay_in_selection() {
        let config = TrainingConfig {
            instrument: Instrument::Piano,
            octaves: vec![2, 6],
            pitch_classes: vec![PitchClass::DSharp, PitchClass::B],
        };
        let possible = config.possible_notes();
        let mut rng = rng();
        let mut session = Session::new();
        session.start(config, t(0), &mut rng);
        for i in 0..50 {
            let note = session.advance(t(i), &mut rng).unwrap();
            assert!(possible.contains(&note));
        }
    }

    #[test]
    fn test_empty_selection_falls_back_to_c4() {
        let config = TrainingConfig {
            pitch_classes: vec![],
            ..TrainingConfig::default()
        };
        let mut session = Session::new();
        let note = session.start(config, t(0), &mut rng());
        assert_eq!(note.to_string(), "C4");
    }

    #[test]
    fn test_incorrect_keeps_note_and_counts_retry() {
        let (mut session, _) = started();
        let note = session.state().current_note;

        let attempt = session.resolve(Resolution::Incorrect, t(500)).unwrap();
        assert!(!attempt.correct);
        assert_eq!(attempt.retries, 0);
        assert_eq!(attempt.response_time_secs, 0.0);

        session.resolve(Resolution::Incorrect, t(900));
        let state = session.state();
        assert_eq!(state.retries, 2);
        assert_eq!(state.incorrect_guesses, 2);
        assert_eq!(state.current_note, note);
        assert_eq!(state.phase, Phase::AwaitingIdentification);
        assert_eq!(state.feedback, Some(Feedback::Incorrect));
    }

    #[test]
    fn test_correct_forwards_retries_and_defers_advance() {
        let (mut session, mut rng) = started();
        let note = session.state().current_note.unwrap();
        session.resolve(Resolution::Incorrect, t(500));

        let attempt = session
            .resolve(
                Resolution::Correct {
                    response_time_secs: 2.5,
                },
                t(2500),
            )
            .unwrap();
        assert_eq!(attempt.note, note);
        assert!(attempt.correct);
        assert_eq!(attempt.retries, 1);
        assert_eq!(attempt.response_time_secs, 2.5);

        // advance is not synchronous
        assert_eq!(session.state().phase, Phase::BetweenNotes);
        assert_eq!(session.state().current_note, Some(note));
        assert_eq!(session.state().feedback, Some(Feedback::Correct { note }));
        assert_eq!(session.tick(t(3000), &mut rng), None);

        let next = session.tick(t(3500), &mut rng);
        assert!(next.is_some());
        let state = session.state();
        assert_eq!(state.phase, Phase::AwaitingIdentification);
        assert_eq!(state.retries, 0);
        assert_eq!(state.note_started_at, Some(t(3500)));
        assert_eq!(state.correct_guesses, 1);
    }

    #[test]
    fn test_no_resolution_between_notes() {
        let (mut session, _) = started();
        session.resolve(
            Resolution::Correct {
                response_time_secs: 1.0,
            },
            t(1000),
        );
        assert!(!session.accepts_input());
        assert_eq!(session.resolve(Resolution::Incorrect, t(1200)), None);
        assert_eq!(session.state().incorrect_guesses, 0);
    }

    #[test]
    fn test_feedback_clears_after_delay() {
        let (mut session, mut rng) = started();
        session.resolve(Resolution::Incorrect, t(100));
        session.tick(t(1000), &mut rng);
        assert_eq!(session.state().feedback, Some(Feedback::Incorrect));
        session.tick(t(1600), &mut rng);
        assert_eq!(session.state().feedback, None);
    }

    #[test]
    fn test_exit_before_pending_advance_wins() {
        let (mut session, mut rng) = started();
        session.resolve(
            Resolution::Correct {
                response_time_secs: 1.0,
            },
            t(1000),
        );
        assert!(session.exit(t(1500)).is_some());
        assert_eq!(session.tick(t(5000), &mut rng), None);
        assert!(!session.is_active());
        assert_eq!(session.state().current_note, None);
    }

    #[test]
    fn test_exit_rounds_elapsed_and_is_idempotent() {
        let (mut session, _) = started();
        session.resolve(Resolution::Incorrect, t(100));
        let summary = session.exit(t(61_600)).unwrap();
        assert_eq!(summary.practiced_secs, 62);
        assert_eq!(summary.incorrect_guesses, 1);
        assert_eq!(session.exit(t(90_000)), None);
    }

    #[test]
    fn test_replay_leaves_state_alone() {
        let (mut session, _) = started();
        session.resolve(Resolution::Incorrect, t(100));
        let before = session.state().clone();
        assert_eq!(session.replay(), before.current_note);
        assert_eq!(session.state(), &before);

        session.exit(t(200));
        assert_eq!(session.replay(), None);
    }

    #[test]
    fn test_advance_requires_active_session() {
        let mut session = Session::new();
        assert_eq!(session.advance(t(0), &mut rng()), None);
        assert_eq!(session.resolve(Resolution::Incorrect, t(0)), None);
    }
}
