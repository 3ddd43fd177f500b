use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::notes::Note;

/// Per-note history older than this is dropped on the next attempt.
pub const STALE_AFTER_DAYS: i64 = 30;

pub const MASTERY_MIN_ATTEMPTS: u32 = 5;
pub const MASTERY_MAX_AVG_RETRIES: f64 = 2.0;
pub const MASTERY_MAX_AVG_TIME_SECS: f64 = 3.0;

/// Calendar day (local time) an instant is filed under.
pub fn date_key(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AccuracyCount {
    pub correct: u32,
    pub incorrect: u32,
}

impl AccuracyCount {
    pub fn total(&self) -> u32 {
        self.correct + self.incorrect
    }
}

/// Rolling statistics for one note. `retries` and `time` hold one entry per
/// correct answer; wrong answers only show up in `total_attempts`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteStats {
    pub note: Note,
    #[serde(default)]
    pub total_attempts: u32,
    #[serde(default)]
    pub correct_attempts: u32,
    #[serde(default)]
    pub retries: Vec<u32>,
    #[serde(default)]
    pub time: Vec<f64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl NoteStats {
    pub fn new(note: Note) -> Self {
        NoteStats {
            note,
            total_attempts: 0,
            correct_attempts: 0,
            retries: Vec::new(),
            time: Vec::new(),
            last_updated: None,
        }
    }

    pub fn average_retries(&self) -> Option<f64> {
        mean(self.retries.iter().map(|&r| r as f64))
    }

    pub fn average_time(&self) -> Option<f64> {
        mean(self.time.iter().copied())
    }

    /// Enough attempts, few retries and quick answers.
    pub fn is_mastered(&self) -> bool {
        if self.retries.is_empty() || self.total_attempts < MASTERY_MIN_ATTEMPTS {
            return false;
        }
        let avg_retries = self.average_retries().unwrap_or(f64::INFINITY);
        let avg_time = self.average_time().unwrap_or(f64::INFINITY);
        avg_retries < MASTERY_MAX_AVG_RETRIES && avg_time < MASTERY_MAX_AVG_TIME_SECS
    }

    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.last_updated
            .is_some_and(|last| now - last > Duration::days(STALE_AFTER_DAYS))
    }

    fn clear_history(&mut self) {
        self.total_attempts = 0;
        self.correct_attempts = 0;
        self.retries.clear();
        self.time.clear();
    }
}

/// Everything the trainer remembers between runs, keyed by calendar day.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressLedger {
    /// Seconds practiced per day.
    pub daily_practice: BTreeMap<NaiveDate, u64>,
    pub accuracy: BTreeMap<NaiveDate, AccuracyCount>,
    /// Retries before each correct answer.
    pub retries: BTreeMap<NaiveDate, Vec<u32>>,
    /// Response time in seconds of each correct answer.
    pub time: BTreeMap<NaiveDate, Vec<f64>>,
    pub hardest_notes: BTreeMap<Note, NoteStats>,
    /// Last computed proficiency score.
    pub perfect_pitch_percentage: f64,
}

impl ProgressLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(
        &mut self,
        date: NaiveDate,
        note: Note,
        correct: bool,
        retries: u32,
        response_time_secs: f64,
        now: DateTime<Utc>,
    ) {
        self.daily_practice.entry(date).or_insert(0);
        let accuracy = self.accuracy.entry(date).or_default();
        let day_retries = self.retries.entry(date).or_default();
        let day_times = self.time.entry(date).or_default();

        if correct {
            accuracy.correct += 1;
            day_retries.push(retries);
            day_times.push(response_time_secs);
        } else {
            accuracy.incorrect += 1;
        }

        let stats = self
            .hardest_notes
            .entry(note)
            .or_insert_with(|| NoteStats::new(note));
        if stats.is_stale(now) {
            debug!("history for {} is stale, starting over", note);
            stats.clear_history();
        }

        stats.total_attempts += 1;
        stats.last_updated = Some(now);
        if correct {
            stats.correct_attempts += 1;
            stats.retries.push(retries);
            stats.time.push(response_time_secs);
        }

        debug!(
            "{} {} on {}: {}/{} correct",
            note,
            if correct { "correct" } else { "incorrect" },
            date,
            stats.correct_attempts,
            stats.total_attempts
        );
    }

    pub fn add_practice_seconds(&mut self, date: NaiveDate, seconds: u64) {
        *self.daily_practice.entry(date).or_insert(0) += seconds;
    }

    pub fn reset(&mut self) {
        *self = ProgressLedger::default();
    }

    pub fn total_accuracy(&self) -> AccuracyCount {
        self.accuracy
            .values()
            .fold(AccuracyCount::default(), |acc, day| AccuracyCount {
                correct: acc.correct + day.correct,
                incorrect: acc.incorrect + day.incorrect,
            })
    }

    pub fn all_retries(&self) -> impl Iterator<Item = u32> + '_ {
        self.retries.values().flatten().copied()
    }

    pub fn all_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.time.values().flatten().copied()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}
