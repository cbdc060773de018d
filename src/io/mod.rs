//! Input/output helpers.
//!
//! - SNID template ingest (`ingest`)
//! - coefficient/eigenspectrum CSV exports (`export`)
//! - whole-set JSON snapshots (`snapshot`)

pub mod export;
pub mod ingest;
pub mod snapshot;

pub use export::*;
pub use ingest::*;
pub use snapshot::*;
