use serde::{Deserialize, Serialize};

/// The proficiency score and the four parts it is summed from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProficiencyBreakdown {
    pub accuracy: f64, // 0-30
    pub retries: f64,  // 0-25
    pub time: f64,     // 0-25
    pub coverage: f64, // 0-20
    pub total: f64,    // 0-100
    pub total_attempts: u32,
    pub avg_retries: f64,
    pub avg_time_secs: f64,
    pub attempted_notes: usize,
    pub mastered_notes: usize,
    pub possible_notes: usize,
    pub feedback: Vec<String>,
}

impl ProficiencyBreakdown {
    /// Whole-number percentage for display.
    pub fn percentage(&self) -> u32 {
        self.total.floor() as u32
    }
}
