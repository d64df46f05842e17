// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the recognize/ignore patterns (glob or regex mode) into a
//!   [`ChangeFilter`].
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does **not** know about supervised processes or restart cycles; it only
//! turns relevant filesystem changes into change signals for the runtime.

pub mod patterns;
pub mod watcher;

pub use patterns::{ChangeFilter, FilterOptions};
pub use watcher::{spawn_watcher, WatcherConfig, WatcherHandle};
