//! Command-line interface module.
//!
//! - `serve` - host bridge behind a WebSocket listener
//! - `render` - one-shot headless render with an in-process surface

mod args;
pub mod render;
pub mod serve;

pub use args::{Cli, Commands};
