// src/restart/mod.rs

//! Restart coordination for supervised processes.
//!
//! This module ties together:
//! - the [`coordinator`]: the admission/execution two-gate state machine
//!   that debounces change signals into serial restart cycles
//! - the [`reconcile`] step that applies a supervisord config reload's
//!   added/changed/removed group sets before restarting
//! - the [`sequencer`] that selects restart targets and drives the
//!   stop → poll → start protocol

pub mod coordinator;
pub mod reconcile;
pub mod sequencer;

pub use coordinator::{CoordinatorOptions, RestartCoordinator};
pub use reconcile::reconcile_groups;
pub use sequencer::{restart_programs, RestartTarget};
