//! Terminal user interface for the demo driver.
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `render` - Frame rendering: tab strip, page body, overlays, status line
//! - `tabs` - Tab workspace, history, and quick search

mod loop_runner;
mod render;
pub mod tabs;

pub use loop_runner::{run, Action};
pub use tabs::Workspace;
