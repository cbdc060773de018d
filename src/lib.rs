//! `nova-pca` library crate.
//!
//! The binary (`nova`) is a thin wrapper around this library so that:
//!
//! - the analysis is testable without spawning processes
//! - notebooks or other front-ends can drive `SpectraSet` directly
//!
//! Layout:
//! - `io`: SNID template loading, snapshots, CSV exports
//! - `dataset`: the `SpectraSet` container and its in-place transformations
//! - `math`: NaN-aware statistics, PCA, t-SNE
//! - `plot`: SVG figures and terminal previews

pub mod app;
pub mod cli;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
