//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - SNID classification (`SneType`, `SneFamily`, `PhaseKind`)
//! - per-object records and the PCA basis (`SpectrumRecord`, `PcaBasis`)
//! - run configuration (`LoadSelection`, `RunConfig`, `PlotConfig`)

pub mod nan_serde;
pub mod types;

pub use types::*;
