//! History ledger of completed conversions.

mod ledger;
mod types;

pub use ledger::HistoryLedger;
pub use types::HistoryEntry;
