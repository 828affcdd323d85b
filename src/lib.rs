//! Fund-custody ledger.
//!
//! The crate models a set of independently-managed funds that pool deposits
//! of one external fungible asset, issue proportional claim tokens to
//! depositors, and release custodied assets only after a balance-weighted
//! holder vote approves a withdrawal request.
//!
//! * [`ledger`] — the process-owned fund registry: fund records, deposit
//!   accounting, the withdrawal voting engine, the event log, and snapshots.
//! * [`claims`] — per-fund claim tokens (holder balances, mint, transfer).
//! * [`withdrawals`] — withdrawal requests and their resolution state machine.
//! * [`assets`] — the external asset collaborator trait plus an in-memory
//!   implementation for tests and the CLI.
//!
//! The modules assume the surrounding environment serializes calls and
//! authenticates callers; each operation takes the caller explicitly and is
//! atomic on its own, so an error never leaves a partial mutation behind.

pub mod assets;
pub mod claims;
pub mod ledger;
pub mod withdrawals;

mod error;

pub use error::LedgerError;
