//! Practice history: the persisted ledger, where it is stored, and the
//! summaries drawn from it.

pub mod ledger;
pub mod store;
pub mod summary;

pub use ledger::{date_key, AccuracyCount, NoteStats, ProgressLedger, STALE_AFTER_DAYS};
#[cfg(target_arch = "wasm32")]
pub use store::LocalStorageStore;
pub use store::{load_or_default, JsonFileStore, LedgerStore, MemoryStore, STORAGE_KEY};
pub use summary::{hardest_notes, weekly_summary, DaySummary, NoteDifficulty};
