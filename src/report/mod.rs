//! Terminal reports for a loaded or reloaded spectra set.

pub mod format;

pub use format::*;
