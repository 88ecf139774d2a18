use tally_types::{AccountId, Amount, TypeError, Version};

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A push targeted a version below the trace tip. Indicates a
    /// version-counter bug; unreachable from external input.
    #[error("out-of-order insertion: version {attempted} is below trace tip {last}")]
    OutOfOrderInsertion { last: Version, attempted: Version },

    #[error("insufficient balance for {account}: available {available}, required {required}")]
    InsufficientBalance {
        account: AccountId,
        available: Amount,
        required: Amount,
    },

    #[error("checkpoint {requested} is in the future (current nonce {current})")]
    FutureCheckpoint { requested: Version, current: Version },

    #[error("invalid account: the null account cannot hold a balance")]
    InvalidAccount,

    #[error("amount {value} overflows ledger storage width")]
    AmountOverflow { value: Amount },

    #[error("ledger lock poisoned")]
    LockPoisoned,

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<TypeError> for LedgerError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::AmountOverflow { value } => LedgerError::AmountOverflow { value },
        }
    }
}

/// Convenience alias used throughout the ledger crate.
pub type Result<T> = std::result::Result<T, LedgerError>;
