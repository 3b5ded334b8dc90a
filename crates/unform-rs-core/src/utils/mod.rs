//! Utility functions for the form engine.
//!
//! This module provides:
//! - [`dotted`]: the dotted-path codec (`flatten` / `extract`).

pub mod dotted;
