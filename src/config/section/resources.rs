//! `[resources]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [resources]
//! fallback_mime = "image/png"   # Used when the extension says nothing
//! ```

use serde::{Deserialize, Serialize};

use crate::utils::mime;

/// How `loadImage` answers are encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// MIME type for resources with an unknown extension.
    pub fallback_mime: String,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            fallback_mime: mime::types::PNG.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_resources_config() {
        assert_eq!(test_parse_config("").resources.fallback_mime, "image/png");

        let config = test_parse_config("[resources]\nfallback_mime = \"image/webp\"");
        assert_eq!(config.resources.fallback_mime, "image/webp");
    }
}
