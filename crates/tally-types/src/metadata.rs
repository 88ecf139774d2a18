use serde::{Deserialize, Serialize};

/// Descriptive token metadata carried by a ledger.
///
/// A fork copies its source's metadata once at construction and never
/// re-reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Tally".into(),
            symbol: "TLY".into(),
            decimals: 9,
        }
    }
}

impl TokenMetadata {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
        }
    }
}
