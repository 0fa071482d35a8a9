//! Configuration section definitions.
//!
//! Each module corresponds to a section in `tilebridge.toml`:
//!
//! | Module      | TOML Section   | Purpose                              |
//! |-------------|----------------|--------------------------------------|
//! | `serve`     | `[serve]`      | WebSocket listener for `serve`       |
//! | `sync`      | `[sync]`       | Write-back formatting                |
//! | `resources` | `[resources]`  | Resource answers for `loadImage`     |

mod resources;
mod serve;
mod sync;

pub use resources::ResourcesConfig;
pub use serve::ServeConfig;
pub use sync::{MAX_INDENT, SyncConfig};
