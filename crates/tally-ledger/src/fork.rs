use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tally_types::{narrow, AccountId, Amount, TokenMetadata, Version};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};
use crate::operation::Operation;
use crate::state::LedgerState;
use crate::trace::{VersionEntry, VersionedTrace, RECENT_LOOKUP_THRESHOLD};
use crate::traits::{BalanceSource, LedgerReader, LedgerWriter};

/// How a fork resolves one account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// No local history; reads go to the source at `anchor`.
    Delegated { anchor: Version },
    /// Materialized; the source is never consulted again.
    Local(&'a VersionedTrace),
}

/// Independent ledger lazily seeded from a source ledger's state at a fixed
/// anchor version.
///
/// Construction copies only the metadata and the anchored total issuance.
/// Accounts stay [`Resolution::Delegated`] until the first local mutation
/// touching them, which materializes the anchored value into a local trace.
/// Later changes to the source are never visible: delegated reads always
/// query the source at the anchor, and materialized reads never query it.
pub struct ForkProjection<S: BalanceSource> {
    anchor: Version,
    source: Arc<S>,
    metadata: TokenMetadata,
    inner: RwLock<LedgerState>,
}

impl<S: BalanceSource> ForkProjection<S> {
    /// Anchor a new fork at `anchor` on `source`, using
    /// [`RECENT_LOOKUP_THRESHOLD`] for its local traces.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::FutureCheckpoint`] if `anchor` is beyond the
    /// source's current nonce, and [`LedgerError::AmountOverflow`] if the
    /// anchored total issuance does not fit the storage width.
    pub fn create(anchor: Version, source: Arc<S>) -> Result<Self> {
        Self::create_with_threshold(anchor, source, RECENT_LOOKUP_THRESHOLD)
    }

    /// Like [`ForkProjection::create`], with an explicit recent-lookup
    /// threshold for local traces.
    pub fn create_with_threshold(
        anchor: Version,
        source: Arc<S>,
        lookup_threshold: usize,
    ) -> Result<Self> {
        let total = source.total_issuance_at(anchor)?;
        let metadata = source.metadata();
        info!(anchor, total = %total, symbol = %metadata.symbol, "fork created");

        Ok(Self {
            anchor,
            metadata,
            inner: RwLock::new(LedgerState::seeded(narrow(total)?, lookup_threshold)),
            source,
        })
    }

    pub fn anchor_version(&self) -> Version {
        self.anchor
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Returns `true` once `account` has local history.
    pub fn is_materialized(&self, account: &AccountId) -> Result<bool> {
        Ok(self.read_state()?.local_trace(account).is_some())
    }

    /// Accounts with local history, sorted.
    pub fn materialized_accounts(&self) -> Result<Vec<AccountId>> {
        let state = self.read_state()?;
        let mut accounts: Vec<_> = state.accounts().copied().collect();
        accounts.sort();
        Ok(accounts)
    }

    pub fn lookup_threshold(&self) -> Result<usize> {
        Ok(self.read_state()?.lookup_threshold())
    }

    /// Run `f` against the current resolution of `account`.
    ///
    /// The fork's read lock is held while `f` runs, so `f` must not call back
    /// into this fork. A mutation (`issue`, `burn`, `move_balance`) from
    /// inside `f` deadlocks the thread.
    pub fn with_resolution<T>(
        &self,
        account: &AccountId,
        f: impl FnOnce(Resolution<'_>) -> T,
    ) -> Result<T> {
        let state = self.read_state()?;
        Ok(f(self.resolution(&state, account)))
    }

    fn resolution<'a>(&self, state: &'a LedgerState, account: &AccountId) -> Resolution<'a> {
        match state.local_trace(account) {
            Some(trace) => Resolution::Local(trace),
            None => Resolution::Delegated {
                anchor: self.anchor,
            },
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, LedgerState>> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl<S: BalanceSource> LedgerWriter for ForkProjection<S> {
    fn apply(&self, op: &Operation) -> Result<Version> {
        let mut state = self.write_state()?;
        let anchor = self.anchor;
        let source = &self.source;

        let result = state.apply(op, |account| {
            let value = source.balance_of_at(account, anchor)?;
            Ok(Some(narrow(value)?))
        });

        match result {
            Ok(version) => {
                debug!(version, anchor, kind = %op.kind(), amount = %op.amount(), "fork operation committed");
                Ok(version)
            }
            Err(err) => {
                warn!(anchor, kind = %op.kind(), error = %err, "fork operation rejected");
                Err(err)
            }
        }
    }
}

impl<S: BalanceSource> BalanceSource for ForkProjection<S> {
    fn balance_of_at(&self, account: &AccountId, version: Version) -> Result<Amount> {
        let state = self.read_state()?;
        match state.local_balance_at(account, version)? {
            Some(value) => Ok(value),
            None => self.source.balance_of_at(account, self.anchor),
        }
    }

    fn total_issuance_at(&self, version: Version) -> Result<Amount> {
        self.read_state()?.total_issuance_at(version)
    }

    fn checkpoint_nonce(&self) -> Result<Version> {
        Ok(self.read_state()?.nonce())
    }

    /// Local accounts plus every account known to the source.
    fn accounts(&self) -> Result<Vec<AccountId>> {
        let mut accounts: BTreeSet<_> = self.source.accounts()?.into_iter().collect();
        accounts.extend(self.read_state()?.accounts().copied());
        Ok(accounts.into_iter().collect())
    }

    fn metadata(&self) -> TokenMetadata {
        self.metadata.clone()
    }
}

impl<S: BalanceSource> LedgerReader for ForkProjection<S> {
    fn balance_of(&self, account: &AccountId) -> Result<Amount> {
        let state = self.read_state()?;
        match self.resolution(&state, account) {
            Resolution::Local(trace) => Ok(trace.latest() as Amount),
            Resolution::Delegated { anchor } => self.source.balance_of_at(account, anchor),
        }
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

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::ledger::CheckpointLedger;
    use crate::LedgerConfig;

    fn alice() -> AccountId {
        AccountId::named("alice")
    }
    fn bob() -> AccountId {
        AccountId::named("bob")
    }
    fn carol() -> AccountId {
        AccountId::named("carol")
    }
    fn dave() -> AccountId {
        AccountId::named("dave")
    }

    /// Source at v3: alice 60, bob 30, total 90.
    fn source() -> Arc<CheckpointLedger> {
        let ledger = Arc::new(CheckpointLedger::default());
        ledger.issue(&alice(), 100).unwrap();
        ledger.move_balance(&alice(), &bob(), 40).unwrap();
        ledger.burn(&bob(), 10).unwrap();
        ledger
    }

    fn assert_anchor_view(fork: &ForkProjection<CheckpointLedger>) {
        assert_eq!(fork.total_issuance().unwrap(), 90);
        assert_eq!(fork.balance_of(&alice()).unwrap(), 60);
        assert_eq!(fork.balance_of(&bob()).unwrap(), 30);
        assert_eq!(fork.balance_of(&carol()).unwrap(), 0);
        assert_eq!(fork.balance_of(&dave()).unwrap(), 0);
    }

    #[test]
    fn fork_is_isolated_from_later_source_operations() {
        let source = source();
        let fork = source.fork_at(3).unwrap();
        assert_anchor_view(&fork);

        source.issue(&alice(), 777).unwrap();
        source.move_balance(&bob(), &carol(), 33).unwrap_err();
        source.move_balance(&bob(), &carol(), 30).unwrap();
        source.burn(&alice(), 111).unwrap();
        source.issue(&dave(), 555).unwrap();

        assert_anchor_view(&fork);
        assert_eq!(fork.checkpoint_nonce().unwrap(), 0);
        assert!(fork.materialized_accounts().unwrap().is_empty());
    }

    #[test]
    fn construction_copies_no_accounts() {
        let fork = source().fork_at(2).unwrap();
        assert_eq!(fork.total_issuance().unwrap(), 100);
        assert_eq!(fork.total_issuance_at(0).unwrap(), 100);
        assert_eq!(fork.balance_of(&bob()).unwrap(), 40);
        assert!(!fork.is_materialized(&alice()).unwrap());
        assert_eq!(fork.num_checkpoints(&alice()).unwrap(), 0);
        assert_eq!(fork.anchor_version(), 2);
    }

    #[test]
    fn materialized_accounts_never_read_the_source_again() {
        let source = source();
        let fork = source.fork_at(3).unwrap();

        assert_eq!(fork.move_balance(&alice(), &bob(), 10).unwrap(), 1);
        assert!(fork.is_materialized(&alice()).unwrap());
        assert!(fork.is_materialized(&bob()).unwrap());
        assert_eq!(fork.balance_of(&alice()).unwrap(), 50);
        assert_eq!(fork.balance_of(&bob()).unwrap(), 40);

        source.issue(&alice(), 1_000).unwrap();
        source.burn(&alice(), 500).unwrap();

        assert_eq!(fork.balance_of(&alice()).unwrap(), 50);
        assert_eq!(fork.balance_of_at(&alice(), 0).unwrap(), 60);
        assert_eq!(fork.balance_of_at(&alice(), 1).unwrap(), 50);
        assert_eq!(fork.total_issuance().unwrap(), 90);
    }

    #[test]
    fn fork_mutations_do_not_touch_the_source() {
        let source = source();
        let fork = source.fork_at(3).unwrap();

        fork.issue(&carol(), 25).unwrap();
        fork.burn(&alice(), 60).unwrap();

        assert_eq!(fork.total_issuance().unwrap(), 55);
        assert_eq!(fork.balance_of(&alice()).unwrap(), 0);
        assert_eq!(fork.checkpoint_nonce().unwrap(), 2);

        assert_eq!(source.total_issuance().unwrap(), 90);
        assert_eq!(source.balance_of(&alice()).unwrap(), 60);
        assert_eq!(source.balance_of(&carol()).unwrap(), 0);
        assert_eq!(source.checkpoint_nonce().unwrap(), 3);
    }

    #[test]
    fn insufficient_delegated_balance_does_not_materialize() {
        let fork = source().fork_at(3).unwrap();
        let err = fork.burn(&bob(), 31).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                account: bob(),
                available: 30,
                required: 31
            }
        );
        assert!(!fork.is_materialized(&bob()).unwrap());
        assert_eq!(fork.checkpoint_nonce().unwrap(), 0);
    }

    #[test]
    fn future_anchor_is_rejected() {
        let source = source();
        let err = source.fork_at(4).err().unwrap();
        assert_eq!(
            err,
            LedgerError::FutureCheckpoint {
                requested: 4,
                current: 3
            }
        );
    }

    #[test]
    fn fork_history_guard_uses_local_nonce() {
        let fork = source().fork_at(3).unwrap();
        assert_eq!(
            fork.balance_of_at(&alice(), 1).unwrap_err(),
            LedgerError::FutureCheckpoint {
                requested: 1,
                current: 0
            }
        );
        assert_eq!(fork.balance_of_at(&alice(), 0).unwrap(), 60);
    }

    #[test]
    fn early_anchor_sees_early_state() {
        let fork = source().fork_at(1).unwrap();
        assert_eq!(fork.total_issuance().unwrap(), 100);
        assert_eq!(fork.balance_of(&alice()).unwrap(), 100);
        assert_eq!(fork.balance_of(&bob()).unwrap(), 0);

        let genesis = source().fork_at(0).unwrap();
        assert_eq!(genesis.total_issuance().unwrap(), 0);
        assert_eq!(genesis.balance_of(&alice()).unwrap(), 0);
    }

    #[test]
    fn fork_of_fork_anchors_on_local_history() {
        let source = source();
        let fork = Arc::new(source.fork_at(3).unwrap());
        fork.move_balance(&alice(), &carol(), 20).unwrap();

        let nested = ForkProjection::create(1, Arc::clone(&fork)).unwrap();
        fork.issue(&carol(), 1).unwrap();

        assert_eq!(nested.balance_of(&alice()).unwrap(), 40);
        assert_eq!(nested.balance_of(&carol()).unwrap(), 20);
        assert_eq!(nested.balance_of(&bob()).unwrap(), 30);
        assert_eq!(nested.total_issuance().unwrap(), 90);
    }

    #[test]
    fn metadata_is_copied_from_source() {
        let config = LedgerConfig::with_metadata(TokenMetadata::new("Share", "SHR", 6));
        let source = Arc::new(CheckpointLedger::new(config));
        let fork = source.fork_at(0).unwrap();
        assert_eq!(fork.metadata(), TokenMetadata::new("Share", "SHR", 6));
    }

    #[test]
    fn resolution_reports_delegation_until_first_write() {
        let fork = source().fork_at(3).unwrap();
        let before = fork.with_resolution(&alice(), |r| r == Resolution::Delegated { anchor: 3 });
        assert!(before.unwrap());

        fork.issue(&alice(), 0).unwrap();
        let latest = fork
            .with_resolution(&alice(), |r| match r {
                Resolution::Local(trace) => Some(trace.latest()),
                Resolution::Delegated { .. } => None,
            })
            .unwrap();
        assert_eq!(latest, Some(60));
    }

    #[test]
    fn fork_inherits_source_lookup_threshold() {
        let config = LedgerConfig {
            recent_lookup_threshold: 1,
            ..LedgerConfig::default()
        };
        let source = Arc::new(CheckpointLedger::new(config));
        source.issue(&alice(), 50).unwrap();
        let fork = source.fork_at(1).unwrap();
        assert_eq!(fork.lookup_threshold().unwrap(), 1);

        for _ in 0..6 {
            fork.move_balance(&alice(), &bob(), 1).unwrap();
        }
        assert_eq!(fork.balance_of_at(&alice(), 0).unwrap(), 50);
        assert_eq!(fork.balance_of_at(&alice(), 2).unwrap(), 48);
        assert_eq!(fork.balance_of_at(&bob(), 6).unwrap(), 6);

        let direct = ForkProjection::create(1, Arc::clone(&source)).unwrap();
        assert_eq!(direct.lookup_threshold().unwrap(), RECENT_LOOKUP_THRESHOLD);
    }

    #[test]
    fn accounts_union_source_and_local() {
        let fork = source().fork_at(3).unwrap();
        fork.issue(&carol(), 5).unwrap();
        let accounts = fork.accounts().unwrap();
        assert_eq!(accounts.len(), 3);
        assert!(accounts.contains(&carol()));
    }

    fn arb_op() -> impl Strategy<Value = Operation> {
        let account =
            prop::sample::select(vec!["alice", "bob", "carol", "dave"]).prop_map(AccountId::named);
        prop_oneof![
            (account.clone(), 0u128..100).prop_map(|(to, amount)| Operation::Issue { to, amount }),
            (account.clone(), 0u128..100)
                .prop_map(|(from, amount)| Operation::Burn { from, amount }),
            (account.clone(), account, 0u128..100)
                .prop_map(|(from, to, amount)| Operation::Move { from, to, amount }),
        ]
    }

    proptest! {
        #[test]
        fn fork_conserves_and_ignores_source(
            fork_ops in prop::collection::vec(arb_op(), 0..40),
            source_ops in prop::collection::vec(arb_op(), 0..40),
        ) {
            let source = source();
            let fork = source.fork_at(3).unwrap();
            for op in &fork_ops {
                let _ = fork.apply(op);
            }
            let before: Vec<_> = [alice(), bob(), carol(), dave()]
                .iter()
                .map(|a| fork.balance_of(a).unwrap())
                .collect();

            for op in &source_ops {
                let _ = source.apply(op);
            }
            let after: Vec<_> = [alice(), bob(), carol(), dave()]
                .iter()
                .map(|a| fork.balance_of(a).unwrap())
                .collect();
            prop_assert_eq!(&before, &after);

            let nonce = fork.checkpoint_nonce().unwrap();
            for version in 0..=nonce {
                let sum: Amount = [alice(), bob(), carol(), dave()]
                    .iter()
                    .map(|a| fork.balance_of_at(a, version).unwrap())
                    .sum();
                prop_assert_eq!(sum, fork.total_issuance_at(version).unwrap());
            }
        }
    }
}
