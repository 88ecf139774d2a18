use tally_types::{AccountId, Amount, TokenMetadata, Version};

use crate::error::Result;
use crate::operation::Operation;
use crate::trace::VersionEntry;

/// Read-only historical view a [`ForkProjection`](crate::ForkProjection)
/// is seeded from.
pub trait BalanceSource: Send + Sync {
    fn balance_of_at(&self, account: &AccountId, version: Version) -> Result<Amount>;

    fn total_issuance_at(&self, version: Version) -> Result<Amount>;

    fn checkpoint_nonce(&self) -> Result<Version>;

    /// Every account that has any history in this ledger, sorted.
    fn accounts(&self) -> Result<Vec<AccountId>>;

    fn metadata(&self) -> TokenMetadata;
}

/// Query boundary for current and historical ledger state.
pub trait LedgerReader: BalanceSource {
    fn balance_of(&self, account: &AccountId) -> Result<Amount>;

    fn total_issuance(&self) -> Result<Amount>;

    /// Number of locally recorded checkpoints for `account`.
    fn num_checkpoints(&self, account: &AccountId) -> Result<usize>;

    fn checkpoint(&self, account: &AccountId, pos: usize) -> Result<Option<VersionEntry>>;
}

/// Mutation boundary. Each call is atomic and returns the version it
/// committed.
pub trait LedgerWriter: Send + Sync {
    fn apply(&self, op: &Operation) -> Result<Version>;

    fn issue(&self, to: &AccountId, amount: Amount) -> Result<Version> {
        self.apply(&Operation::Issue { to: *to, amount })
    }

    fn burn(&self, from: &AccountId, amount: Amount) -> Result<Version> {
        self.apply(&Operation::Burn {
            from: *from,
            amount,
        })
    }

    fn move_balance(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<Version> {
        self.apply(&Operation::Move {
            from: *from,
            to: *to,
            amount,
        })
    }
}
