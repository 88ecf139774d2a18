use crate::error::TypeError;

/// Balance or supply as seen by callers of the ledger.
pub type Amount = u128;

/// Balance or supply as held inside a trace.
pub type StoredAmount = u64;

/// Checkpoint counter. Version `0` is the empty genesis state.
pub type Version = u64;

/// Narrow an external amount to the storage width.
///
/// # Errors
///
/// Returns [`TypeError::AmountOverflow`] if `value` exceeds [`StoredAmount::MAX`].
pub fn narrow(value: Amount) -> Result<StoredAmount, TypeError> {
    StoredAmount::try_from(value).map_err(|_| TypeError::AmountOverflow { value })
}
