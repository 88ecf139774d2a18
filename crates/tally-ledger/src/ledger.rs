use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tally_types::{AccountId, Amount, TokenMetadata, Version};
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::fork::ForkProjection;
use crate::operation::Operation;
use crate::state::LedgerState;
use crate::trace::VersionEntry;
use crate::traits::{BalanceSource, LedgerReader, LedgerWriter};

/// Point-in-time queryable balance ledger.
///
/// One global checkpoint nonce advances by exactly one per successful
/// mutation, whatever the amount. Every account and the total issuance keep
/// an append-only [`VersionedTrace`](crate::VersionedTrace), so any reached
/// version can be queried later.
pub struct CheckpointLedger {
    config: LedgerConfig,
    inner: RwLock<LedgerState>,
}

impl CheckpointLedger {
    pub fn new(config: LedgerConfig) -> Self {
        let inner = RwLock::new(LedgerState::new(config.recent_lookup_threshold));
        Self { config, inner }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Derive an independent ledger seeded from this one as of `anchor`.
    /// The fork inherits this ledger's recent-lookup threshold.
    pub fn fork_at(self: &Arc<Self>, anchor: Version) -> Result<ForkProjection<Self>> {
        ForkProjection::create_with_threshold(
            anchor,
            Arc::clone(self),
            self.config.recent_lookup_threshold,
        )
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, LedgerState>> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl Default for CheckpointLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl LedgerWriter for CheckpointLedger {
    fn apply(&self, op: &Operation) -> Result<Version> {
        let mut state = self.write_state()?;
        match state.apply(op, |_| Ok(None)) {
            Ok(version) => {
                debug!(version, kind = %op.kind(), amount = %op.amount(), "operation committed");
                Ok(version)
            }
            Err(err) => {
                warn!(kind = %op.kind(), error = %err, "operation rejected");
                Err(err)
            }
        }
    }
}

impl BalanceSource for CheckpointLedger {
    fn balance_of_at(&self, account: &AccountId, version: Version) -> Result<Amount> {
        let state = self.read_state()?;
        Ok(state.local_balance_at(account, version)?.unwrap_or(0))
    }

    fn total_issuance_at(&self, version: Version) -> Result<Amount> {
        self.read_state()?.total_issuance_at(version)
    }

    fn checkpoint_nonce(&self) -> Result<Version> {
        Ok(self.read_state()?.nonce())
    }

    fn accounts(&self) -> Result<Vec<AccountId>> {
        let state = self.read_state()?;
        let mut accounts: Vec<_> = state.accounts().copied().collect();
        accounts.sort();
        Ok(accounts)
    }

    fn metadata(&self) -> TokenMetadata {
        self.config.metadata.clone()
    }
}

impl LedgerReader for CheckpointLedger {
    fn balance_of(&self, account: &AccountId) -> Result<Amount> {
        let state = self.read_state()?;
        Ok(state
            .local_trace(account)
            .map_or(0, |trace| trace.latest() as Amount))
    }

    fn total_issuance(&self) -> Result<Amount> {
        Ok(self.read_state()?.total_issuance())
    }

    fn num_checkpoints(&self, account: &AccountId) -> Result<usize> {
        let state = self.read_state()?;
        Ok(state.local_trace(account).map_or(0, |trace| trace.len()))
    }

    fn checkpoint(&self, account: &AccountId, pos: usize) -> Result<Option<VersionEntry>> {
        let state = self.read_state()?;
        Ok(state.local_trace(account).and_then(|trace| trace.entry_at(pos)))
    }
}
