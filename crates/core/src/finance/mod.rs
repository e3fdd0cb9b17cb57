//! Financial transaction mirror.
//!
//! Every accepted payment-ledger entry is mirrored into a financial
//! transaction for reporting. The mirror is written in the same unit of
//! work as the ledger entry and is never read back by the engine itself.

pub mod types;

pub use types::{mirror_entry, FinancialKind, FinancialTransaction};
