use chrono::{Days, NaiveDate};
use serde::Serialize;

use super::ledger::{mean, ProgressLedger};
use crate::notes::Note;

pub const SUMMARY_DAYS: u64 = 7;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub practice_secs: u64,
    pub correct: u32,
    pub incorrect: u32,
    pub accuracy_percent: f64,
    pub avg_retries: f64,
    pub avg_time_secs: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct NoteDifficulty {
    pub note: Note,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub accuracy_percent: f64,
    pub avg_retries: f64,
    pub avg_time_secs: f64,
    pub mastered: bool,
}

/// The last seven days ending with `today`, oldest first. Days without data
/// report zeros.
pub fn weekly_summary(ledger: &ProgressLedger, today: NaiveDate) -> Vec<DaySummary> {
    (0..SUMMARY_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| day_summary(ledger, date))
        .collect()
}

pub fn day_summary(ledger: &ProgressLedger, date: NaiveDate) -> DaySummary {
    let accuracy = ledger.accuracy.get(&date).copied().unwrap_or_default();
    let retries = ledger.retries.get(&date).map(Vec::as_slice).unwrap_or(&[]);
    let times = ledger.time.get(&date).map(Vec::as_slice).unwrap_or(&[]);

    DaySummary {
        date,
        practice_secs: ledger.daily_practice.get(&date).copied().unwrap_or(0),
        correct: accuracy.correct,
        incorrect: accuracy.incorrect,
        accuracy_percent: percent(accuracy.correct, accuracy.total()),
        avg_retries: mean(retries.iter().map(|&r| r as f64)).unwrap_or(0.0),
        avg_time_secs: mean(times.iter().copied()).unwrap_or(0.0),
    }
}

/// Per-note averages, hardest first: most retries, then slowest answers.
pub fn hardest_notes(ledger: &ProgressLedger) -> Vec<NoteDifficulty> {
    let mut notes: Vec<NoteDifficulty> = ledger
        .hardest_notes
        .values()
        .map(|stats| NoteDifficulty {
            note: stats.note,
            total_attempts: stats.total_attempts,
            correct_attempts: stats.correct_attempts,
            accuracy_percent: percent(stats.correct_attempts, stats.total_attempts),
            avg_retries: stats.average_retries().unwrap_or(0.0),
            avg_time_secs: stats.average_time().unwrap_or(0.0),
            mastered: stats.is_mastered(),
        })
        .collect();

    notes.sort_by(|a, b| {
        b.avg_retries
            .total_cmp(&a.avg_retries)
            .then(b.avg_time_secs.total_cmp(&a.avg_time_secs))
            .then(a.note.cmp(&b.note))
    });
    notes
}

fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
