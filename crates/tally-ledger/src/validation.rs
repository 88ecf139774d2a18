use tally_types::{Amount, Version};

use crate::error::Result;
use crate::traits::LedgerReader;

/// Result of validating a ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub nonce: Version,
    pub account_count: usize,
    pub conservation_holds: bool,
    pub traces_ordered: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub version: Version,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// Sum of balances differs from total issuance.
    ConservationBreak,
    /// A trace has two entries out of version order.
    TraceOrder,
    /// A trace holds an entry past the ledger nonce.
    TraceBeyondNonce,
}

/// Checks conservation and trace ordering across every reached version.
pub struct ConservationValidator;

impl ConservationValidator {
    pub fn validate<R: LedgerReader>(reader: &R) -> Result<ValidationReport> {
        let nonce = reader.checkpoint_nonce()?;
        let accounts = reader.accounts()?;
        let mut violations = Vec::new();
        let mut traces_ordered = true;
        let mut conservation_holds = true;

        for account in &accounts {
            let mut previous: Option<Version> = None;
            for pos in 0..reader.num_checkpoints(account)? {
                let Some(entry) = reader.checkpoint(account, pos)? else {
                    break;
                };
                if previous.is_some_and(|p| entry.version <= p) {
                    traces_ordered = false;
                    violations.push(Violation {
                        version: entry.version,
                        kind: ViolationKind::TraceOrder,
                        description: format!("{account} checkpoint {pos} is not after its predecessor"),
                    });
                }
                if entry.version > nonce {
                    traces_ordered = false;
                    violations.push(Violation {
                        version: entry.version,
                        kind: ViolationKind::TraceBeyondNonce,
                        description: format!("{account} has a checkpoint past nonce {nonce}"),
                    });
                }
                previous = Some(entry.version);
            }
        }

        for version in 0..=nonce {
            let mut sum: Amount = 0;
            for account in &accounts {
                sum += reader.balance_of_at(account, version)?;
            }
            let total = reader.total_issuance_at(version)?;
            if sum != total {
                conservation_holds = false;
                violations.push(Violation {
                    version,
                    kind: ViolationKind::ConservationBreak,
                    description: format!("balances sum to {sum}, total issuance is {total}"),
                });
            }
        }

        Ok(ValidationReport {
            nonce,
            account_count: accounts.len(),
            conservation_holds,
            traces_ordered,
            violations,
        })
    }
}
