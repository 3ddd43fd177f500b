pub mod proficiency;
pub mod types;

pub use proficiency::{analyze, score};
pub use types::ProficiencyBreakdown;
