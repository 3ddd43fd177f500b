use crate::notes::Note;
use crate::progress::ProgressLedger;
use crate::scoring::types::ProficiencyBreakdown;

pub const ACCURACY_WEIGHT: f64 = 30.0;
pub const RETRIES_WEIGHT: f64 = 25.0;
pub const TIME_WEIGHT: f64 = 25.0;
pub const COVERAGE_WEIGHT: f64 = 20.0;

/// Points lost per average retry.
const RETRY_PENALTY: f64 = 5.0;
/// Decay constant of the time score: at 3s an answer is worth ~37% of the weight.
const TIME_DECAY_SECS: f64 = 3.0;
/// Average response time assumed before any correct answer exists.
const DEFAULT_AVG_TIME_SECS: f64 = 10.0;

/// Overall "perfect pitch" percentage in [0, 100].
pub fn score(ledger: &ProgressLedger, possible_notes: &[Note]) -> f64 {
    analyze(ledger, possible_notes).total
}

pub fn analyze(ledger: &ProgressLedger, possible_notes: &[Note]) -> ProficiencyBreakdown {
    // Accuracy over every attempt ever made
    let totals = ledger.total_accuracy();
    let total_attempts = totals.total();
    let accuracy = if total_attempts > 0 {
        totals.correct as f64 / total_attempts as f64 * ACCURACY_WEIGHT
    } else {
        0.0
    };

    // Retries preceding each correct answer
    let (retry_sum, retry_count) = ledger
        .all_retries()
        .fold((0.0, 0usize), |(s, c), r| (s + r as f64, c + 1));
    let avg_retries = if retry_count > 0 {
        retry_sum / retry_count as f64
    } else {
        0.0
    };
    let retries = (RETRIES_WEIGHT - avg_retries * RETRY_PENALTY).max(0.0);

    // Exponential decay on the average response time
    let (time_sum, time_count) = ledger
        .all_times()
        .fold((0.0, 0usize), |(s, c), t| (s + t, c + 1));
    let avg_time_secs = if time_count > 0 {
        time_sum / time_count as f64
    } else {
        DEFAULT_AVG_TIME_SECS
    };
    let time = (TIME_WEIGHT * (-avg_time_secs / TIME_DECAY_SECS).exp()).max(0.0);

    // Coverage: the lesser of notes tried and notes mastered
    let possible = possible_notes.len().max(1);
    let attempted_notes = ledger.hardest_notes.len();
    let mastered_notes = ledger
        .hardest_notes
        .values()
        .filter(|stats| stats.is_mastered())
        .count();
    let coverage_pct = attempted_notes as f64 / possible as f64 * 100.0;
    let mastered_pct = mastered_notes as f64 / possible as f64 * 100.0;
    let coverage = coverage_pct.min(mastered_pct) / 100.0 * COVERAGE_WEIGHT;

    let total = (accuracy + retries + time + coverage).clamp(0.0, 100.0);

    let mut breakdown = ProficiencyBreakdown {
        accuracy,
        retries,
        time,
        coverage,
        total,
        total_attempts,
        avg_retries,
        avg_time_secs,
        attempted_notes,
        mastered_notes,
        possible_notes: possible_notes.len(),
        feedback: Vec::new(),
    };
    breakdown.feedback = feedback(&breakdown);
    breakdown
}

fn feedback(b: &ProficiencyBreakdown) -> Vec<String> {
    let mut feedback = Vec::new();

    if b.total_attempts == 0 {
        feedback.push("Start a training session to build your score.".to_string());
        return feedback;
    }

    let pct = b.accuracy / ACCURACY_WEIGHT * 100.0;
    if pct >= 90.0 {
        feedback.push(format!("Excellent! {:.0}% of your answers are right.", pct));
    } else if pct >= 60.0 {
        feedback.push(format!("Good work, {:.0}% of your answers are right.", pct));
    } else {
        feedback.push(format!(
            "{:.0}% of your answers are right. Listen to the note again before answering.",
            pct
        ));
    }

    if b.avg_retries >= 2.0 {
        feedback.push(format!(
            "You need {:.1} tries per note on average. Try fewer notes at once.",
            b.avg_retries
        ));
    }

    if b.avg_time_secs >= 5.0 {
        feedback.push(format!(
            "Answers take {:.1}s on average. Aim for under 3 seconds.",
            b.avg_time_secs
        ));
    }

    if b.mastered_notes < b.possible_notes.max(1) {
        feedback.push(format!(
            "{} of {} notes mastered.",
            b.mastered_notes,
            b.possible_notes.max(1)
        ));
    }

    feedback
}
