//! Keyboard-driven page navigation: a vim-style key-sequence interpreter
//! with hint-based link activation.
//!
//! The core is two small state machines. The sequence resolver
//! ([`resolver::SequenceResolver`]) maps multi-key bindings to commands,
//! deferring ambiguous exact matches behind a disambiguation window. The
//! hint engine ([`hints::HintSession`]) labels visible link targets with
//! short letter sequences and narrows them as the user types. Both drive
//! any surface implementing the [`page::Page`] trait; the bundled demo
//! driver browses markdown documents in a terminal.

pub mod config;
pub mod controller;
mod dispatch;
pub mod exclude;
pub mod hints;
pub mod host;
pub mod keymap;
pub mod page;
pub mod resolver;
pub mod scroll;
pub mod ui;
