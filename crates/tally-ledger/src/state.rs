use std::collections::HashMap;

use tally_types::{narrow, AccountId, Amount, StoredAmount, Version};

use crate::error::{LedgerError, Result};
use crate::operation::Operation;
use crate::trace::VersionedTrace;

/// Version at which a ledger's initial state is recorded.
pub const GENESIS_VERSION: Version = 0;

/// Counter and traces shared by [`CheckpointLedger`](crate::CheckpointLedger)
/// and [`ForkProjection`](crate::ForkProjection).
///
/// Mutations are staged into a [`Changeset`] and committed only once every
/// precondition has passed, so a failed operation leaves no trace.
#[derive(Clone, Debug, Default)]
pub(crate) struct LedgerState {
    nonce: Version,
    total_issuance: VersionedTrace,
    balances: HashMap<AccountId, VersionedTrace>,
    lookup_threshold: usize,
}

/// Writes staged by one operation at a single version.
#[derive(Debug)]
struct Changeset {
    version: Version,
    total_issuance: Option<StoredAmount>,
    /// Accounts materialized at [`GENESIS_VERSION`] before the writes land.
    seeds: Vec<(AccountId, StoredAmount)>,
    writes: Vec<(AccountId, StoredAmount)>,
}

impl Changeset {
    fn new(version: Version) -> Self {
        Self {
            version,
            total_issuance: None,
            seeds: Vec::new(),
            writes: Vec::new(),
        }
    }

    fn staged(&self, account: &AccountId) -> Option<StoredAmount> {
        self.writes
            .iter()
            .rev()
            .chain(self.seeds.iter())
            .find(|(a, _)| a == account)
            .map(|(_, v)| *v)
    }
}

impl LedgerState {
    pub(crate) fn new(lookup_threshold: usize) -> Self {
        Self {
            lookup_threshold,
            ..Default::default()
        }
    }

    /// State whose total issuance starts at `total` at [`GENESIS_VERSION`].
    pub(crate) fn seeded(total: StoredAmount, lookup_threshold: usize) -> Self {
        Self {
            total_issuance: VersionedTrace::starting_with(GENESIS_VERSION, total),
            ..Self::new(lookup_threshold)
        }
    }

    pub(crate) fn lookup_threshold(&self) -> usize {
        self.lookup_threshold
    }

    pub(crate) fn nonce(&self) -> Version {
        self.nonce
    }

    pub(crate) fn local_trace(&self, account: &AccountId) -> Option<&VersionedTrace> {
        self.balances.get(account)
    }

    pub(crate) fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.balances.keys()
    }

    pub(crate) fn total_issuance(&self) -> Amount {
        self.total_issuance.latest() as Amount
    }

    pub(crate) fn total_issuance_at(&self, version: Version) -> Result<Amount> {
        self.ensure_reached(version)?;
        Ok(self
            .total_issuance
            .recent_lookup(version, self.lookup_threshold) as Amount)
    }

    /// Historical balance from the local trace; `None` if the account has
    /// no local history.
    pub(crate) fn local_balance_at(
        &self,
        account: &AccountId,
        version: Version,
    ) -> Result<Option<Amount>> {
        self.ensure_reached(version)?;
        Ok(self
            .balances
            .get(account)
            .map(|t| t.recent_lookup(version, self.lookup_threshold) as Amount))
    }

    pub(crate) fn ensure_reached(&self, version: Version) -> Result<()> {
        if version > self.nonce {
            return Err(LedgerError::FutureCheckpoint {
                requested: version,
                current: self.nonce,
            });
        }
        Ok(())
    }

    /// Apply `op` at version `nonce + 1`.
    ///
    /// `seed` is consulted for accounts with no local trace: `Some(value)`
    /// materializes the account with `value` at [`GENESIS_VERSION`] before
    /// the new entry is pushed, `None` treats it as an empty account.
    pub(crate) fn apply<F>(&mut self, op: &Operation, mut seed: F) -> Result<Version>
    where
        F: FnMut(&AccountId) -> Result<Option<StoredAmount>>,
    {
        let mut cs = Changeset::new(self.nonce + 1);

        match op {
            Operation::Issue { to, amount } => {
                ensure_valid(to)?;
                let amount = narrow(*amount)?;
                let total = checked_add(self.total_issuance.latest(), amount)?;
                cs.total_issuance = Some(total);
                let balance = self.current(&mut cs, to, &mut seed)?;
                cs.writes.push((*to, checked_add(balance, amount)?));
            }
            Operation::Burn { from, amount } => {
                ensure_valid(from)?;
                let balance = self.current(&mut cs, from, &mut seed)?;
                let amount = ensure_covers(from, balance, *amount)?;
                // Conservation keeps total issuance at or above any balance.
                let total = self
                    .total_issuance
                    .latest()
                    .checked_sub(amount)
                    .ok_or(LedgerError::AmountOverflow {
                        value: amount as Amount,
                    })?;
                cs.total_issuance = Some(total);
                cs.writes.push((*from, balance - amount));
            }
            Operation::Move { from, to, amount } => {
                ensure_valid(from)?;
                ensure_valid(to)?;
                let balance = self.current(&mut cs, from, &mut seed)?;
                let amount = ensure_covers(from, balance, *amount)?;
                cs.writes.push((*from, balance - amount));
                // Read after the debit is staged, so a self-move nets to zero.
                let receiver = self.current(&mut cs, to, &mut seed)?;
                cs.writes.push((*to, checked_add(receiver, amount)?));
            }
        }

        self.commit(cs)
    }

    /// Latest value of `account` as seen by the changeset being built.
    fn current<F>(
        &self,
        cs: &mut Changeset,
        account: &AccountId,
        seed: &mut F,
    ) -> Result<StoredAmount>
    where
        F: FnMut(&AccountId) -> Result<Option<StoredAmount>>,
    {
        if let Some(value) = cs.staged(account) {
            return Ok(value);
        }
        if let Some(trace) = self.balances.get(account) {
            return Ok(trace.latest());
        }
        match seed(account)? {
            Some(value) => {
                cs.seeds.push((*account, value));
                Ok(value)
            }
            None => Ok(0),
        }
    }

    fn commit(&mut self, cs: Changeset) -> Result<Version> {
        let version = cs.version;

        let blocked = cs
            .writes
            .iter()
            .filter_map(|(account, _)| self.balances.get(account))
            .chain(cs.total_issuance.map(|_| &self.total_issuance))
            .find(|trace| !trace.accepts(version));
        if let Some(trace) = blocked {
            return Err(LedgerError::OutOfOrderInsertion {
                last: trace.last_version().unwrap_or(GENESIS_VERSION),
                attempted: version,
            });
        }

        for (account, value) in cs.seeds {
            tracing::trace!(account = %account, value, "materializing account");
            self.balances
                .entry(account)
                .or_default()
                .push(GENESIS_VERSION, value)?;
        }
        if let Some(total) = cs.total_issuance {
            self.total_issuance.push(version, total)?;
        }
        for (account, value) in cs.writes {
            self.balances.entry(account).or_default().push(version, value)?;
        }

        self.nonce = version;
        Ok(version)
    }
}

fn ensure_valid(account: &AccountId) -> Result<()> {
    if account.is_null() {
        return Err(LedgerError::InvalidAccount);
    }
    Ok(())
}

/// Check `balance >= required` and narrow `required` to storage width.
fn ensure_covers(
    account: &AccountId,
    balance: StoredAmount,
    required: Amount,
) -> Result<StoredAmount> {
    if (balance as Amount) < required {
        return Err(LedgerError::InsufficientBalance {
            account: *account,
            available: balance as Amount,
            required,
        });
    }
    Ok(narrow(required)?)
}

fn checked_add(a: StoredAmount, b: StoredAmount) -> Result<StoredAmount> {
    a.checked_add(b).ok_or(LedgerError::AmountOverflow {
        value: a as Amount + b as Amount,
    })
}
