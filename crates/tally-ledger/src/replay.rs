use tally_types::Version;
use tracing::debug;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::fork::ForkProjection;
use crate::ledger::CheckpointLedger;
use crate::operation::Operation;
use crate::state::GENESIS_VERSION;
use crate::traits::{BalanceSource, LedgerWriter};

/// An operation the ledger refused during replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedOperation {
    /// Position in the replayed log.
    pub index: usize,
    pub operation: Operation,
    pub error: LedgerError,
}

/// Outcome of replaying an operation log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayResult {
    /// Committed version for each accepted operation, in log order.
    pub applied: Vec<Version>,
    pub rejected: Vec<RejectedOperation>,
}

impl ReplayResult {
    pub fn evaluated(&self) -> usize {
        self.applied.len() + self.rejected.len()
    }
}

/// Deterministic replay of operation logs.
pub struct ReplayEngine;

impl ReplayEngine {
    /// Apply `ops` in order. Rejected operations are recorded and skipped.
    pub fn replay<W: LedgerWriter>(writer: &W, ops: &[Operation]) -> ReplayResult {
        let mut result = ReplayResult::default();
        for (index, op) in ops.iter().enumerate() {
            match writer.apply(op) {
                Ok(version) => result.applied.push(version),
                Err(error) => result.rejected.push(RejectedOperation {
                    index,
                    operation: op.clone(),
                    error,
                }),
            }
        }
        debug!(
            applied = result.applied.len(),
            rejected = result.rejected.len(),
            "replay finished"
        );
        result
    }

    /// Parse a JSON array of operations and replay it.
    pub fn replay_json<W: LedgerWriter>(writer: &W, json: &str) -> Result<ReplayResult> {
        let ops: Vec<Operation> =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidInput(e.to_string()))?;
        Ok(Self::replay(writer, &ops))
    }

    /// Build a fresh ledger from an operation log.
    pub fn rebuild(config: LedgerConfig, ops: &[Operation]) -> (CheckpointLedger, ReplayResult) {
        let ledger = CheckpointLedger::new(config);
        let result = Self::replay(&ledger, ops);
        (ledger, result)
    }

    /// Check that a fork's genesis state agrees with its source at the
    /// anchor for the total issuance and every account the source knows.
    pub fn verify_fork_snapshot<S: BalanceSource>(fork: &ForkProjection<S>) -> Result<bool> {
        let source = fork.source();
        let anchor = fork.anchor_version();

        if fork.total_issuance_at(GENESIS_VERSION)? != source.total_issuance_at(anchor)? {
            return Ok(false);
        }
        for account in source.accounts()? {
            if fork.balance_of_at(&account, GENESIS_VERSION)?
                != source.balance_of_at(&account, anchor)?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
