use std::collections::BTreeMap;

use tally_types::{AccountId, Amount, Version};

use crate::error::Result;
use crate::trace::VersionEntry;
use crate::traits::LedgerReader;

/// Non-zero balances and total issuance as of one version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoldersSnapshot {
    pub version: Version,
    pub total_issuance: Amount,
    pub balances: BTreeMap<AccountId, Amount>,
}

/// Locally recorded checkpoints for one account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountHistory {
    pub account: AccountId,
    pub current: Amount,
    pub checkpoints: Vec<VersionEntry>,
}

/// Deterministic projection builders.
pub struct ProjectionBuilder;

impl ProjectionBuilder {
    pub fn holders_at<R: LedgerReader>(reader: &R, version: Version) -> Result<HoldersSnapshot> {
        let total_issuance = reader.total_issuance_at(version)?;
        let mut balances = BTreeMap::new();
        for account in reader.accounts()? {
            let balance = reader.balance_of_at(&account, version)?;
            if balance > 0 {
                balances.insert(account, balance);
            }
        }
        Ok(HoldersSnapshot {
            version,
            total_issuance,
            balances,
        })
    }

    pub fn account_history<R: LedgerReader>(
        reader: &R,
        account: &AccountId,
    ) -> Result<AccountHistory> {
        let count = reader.num_checkpoints(account)?;
        let mut checkpoints = Vec::with_capacity(count);
        for pos in 0..count {
            if let Some(entry) = reader.checkpoint(account, pos)? {
                checkpoints.push(entry);
            }
        }
        Ok(AccountHistory {
            account: *account,
            current: reader.balance_of(account)?,
            checkpoints,
        })
    }
}
