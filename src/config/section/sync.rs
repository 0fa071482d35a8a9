//! `[sync]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [sync]
//! indent = 2      # Pretty-print indent for written-back documents, 0 = compact
//! ```

use serde::{Deserialize, Serialize};

/// Largest accepted indent.
pub const MAX_INDENT: usize = 16;

/// Document write-back settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Spaces per indent level when writing surface edits.
    pub indent: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_sync_config() {
        assert_eq!(test_parse_config("").sync.indent, 2);
        assert_eq!(test_parse_config("[sync]\nindent = 0").sync.indent, 0);
        assert_eq!(test_parse_config("[sync]\nindent = 4").sync.indent, 4);
    }
}
