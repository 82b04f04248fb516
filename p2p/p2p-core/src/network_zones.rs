//! The network zones Galena can operate on.

mod clear;

pub use clear::ClearNet;
