use std::fmt;

use serde::{Deserialize, Serialize};
use tally_types::{AccountId, Amount};

/// A mutating ledger call, as recorded in an operation log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Issue {
        to: AccountId,
        amount: Amount,
    },
    Burn {
        from: AccountId,
        amount: Amount,
    },
    Move {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
}

/// Discriminant of an [`Operation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Issue,
    Burn,
    Move,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Issue { .. } => OperationKind::Issue,
            Operation::Burn { .. } => OperationKind::Burn,
            Operation::Move { .. } => OperationKind::Move,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Operation::Issue { amount, .. }
            | Operation::Burn { amount, .. }
            | Operation::Move { amount, .. } => *amount,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::Issue => "issue",
            OperationKind::Burn => "burn",
            OperationKind::Move => "move",
        };
        write!(f, "{s}")
    }
}
