use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("amount {value} does not fit in storage width")]
    AmountOverflow { value: u128 },
}
