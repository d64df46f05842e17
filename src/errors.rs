// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! At the moment this is just a thin wrapper around `anyhow`; structured
//! errors for the process-control boundary live in [`crate::control`].

pub use anyhow::{Error, Result};
