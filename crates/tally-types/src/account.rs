use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, fixed-size account identifier.
///
/// Named accounts hash their label with BLAKE3 under a fixed domain tag, so
/// the same label always yields the same id. The all-zero id is the null
/// account: it never holds a balance and every ledger mutation rejects it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId([u8; 32]);

impl AccountId {
    /// Account id for a human-readable label (e.g. `"treasury"`).
    pub fn named(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"tally-account-v1:");
        hasher.update(label.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub const fn null() -> Self {
        Self([0u8; 32])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// `acct:` followed by the first four bytes in hex.
    pub fn short_id(&self) -> String {
        format!("acct:{}", hex::encode(&self.0[..4]))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.short_id())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_id())
    }
}
