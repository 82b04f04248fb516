//! Utilities shared across the Galena workspace.
//!
//! Keep this crate small; anything with a better home should live there
//! instead.

pub mod asynch;
