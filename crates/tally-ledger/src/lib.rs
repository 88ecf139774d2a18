//! Versioned checkpoint ledger for Tally.
//!
//! This crate is the heart of Tally. It provides:
//! - [`VersionedTrace`], an append-only per-entity value history with
//!   point-in-time lookup
//! - [`CheckpointLedger`], issue/burn/move under one global checkpoint nonce
//! - [`ForkProjection`], an independent ledger lazily seeded from another
//!   ledger's state at a fixed anchor version
//! - `LedgerReader` / `LedgerWriter` / `BalanceSource` trait boundaries
//! - Operation-log replay, conservation validation, and holder projections

pub mod config;
pub mod error;
pub mod fork;
pub mod ledger;
pub mod operation;
pub mod projection;
pub mod replay;
mod state;
pub mod trace;
pub mod traits;
pub mod validation;

pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use fork::{ForkProjection, Resolution};
pub use ledger::CheckpointLedger;
pub use operation::{Operation, OperationKind};
pub use projection::{AccountHistory, HoldersSnapshot, ProjectionBuilder};
pub use replay::{RejectedOperation, ReplayEngine, ReplayResult};
pub use state::GENESIS_VERSION;
pub use trace::{VersionEntry, VersionedTrace, RECENT_LOOKUP_THRESHOLD};
pub use traits::{BalanceSource, LedgerReader, LedgerWriter};
pub use validation::{ConservationValidator, ValidationReport, Violation, ViolationKind};
