//! Foundation types for the Tally checkpoint ledger.
//!
//! Every other Tally crate depends on `tally-types`.
//!
//! # Key Types
//!
//! - [`AccountId`] — 32-byte account identity hashed from a label
//! - [`Amount`] / [`StoredAmount`] — external and storage-width balances
//! - [`Version`] — the ledger checkpoint counter
//! - [`TokenMetadata`] — name, symbol, and decimals carried by a ledger

pub mod account;
pub mod amount;
pub mod error;
pub mod metadata;

pub use account::AccountId;
pub use amount::{narrow, Amount, StoredAmount, Version};
pub use error::TypeError;
pub use metadata::TokenMetadata;
