use serde::{Deserialize, Serialize};
use tally_types::TokenMetadata;

use crate::error::{LedgerError, Result};
use crate::trace::RECENT_LOOKUP_THRESHOLD;

/// Configuration for a [`CheckpointLedger`](crate::CheckpointLedger).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Name, symbol, and decimals reported by the ledger.
    pub metadata: TokenMetadata,
    /// Trace length above which historical queries start near the tip
    /// before binary-searching.
    pub recent_lookup_threshold: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            metadata: TokenMetadata::default(),
            recent_lookup_threshold: RECENT_LOOKUP_THRESHOLD,
        }
    }
}

impl LedgerConfig {
    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| LedgerError::Config(e.to_string()))
    }

    pub fn with_metadata(metadata: TokenMetadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LedgerConfig::default();
        assert_eq!(c.recent_lookup_threshold, 5);
        assert_eq!(c.metadata.decimals, 9);
    }

    #[test]
    fn parses_partial_toml() {
        let c = LedgerConfig::from_toml_str(
            r#"
            recent_lookup_threshold = 8

            [metadata]
            name = "Vault Share"
            symbol = "vSHR"
            "#,
        )
        .unwrap();
        assert_eq!(c.recent_lookup_threshold, 8);
        assert_eq!(c.metadata.symbol, "vSHR");
        assert_eq!(c.metadata.decimals, 9);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = LedgerConfig::from_toml_str("recent_lookup_threshold = \"many\"").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }
}
