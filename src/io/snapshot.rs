//! Save and reload a whole `SpectraSet`.
//!
//! The snapshot is the "resume analysis" format: everything the pipeline has
//! computed so far (grid, records, normalization, PCA basis, coefficients) in
//! one pretty-printed JSON document, plus a small header:
//!
//! - `tool`: always `"nova"`
//! - `format_version`: bumped on incompatible layout changes
//! - `saved_at`: UTC timestamp
//!
//! NaN samples are written as `null` (see `domain::nan_serde`) and `serde_json`
//! is built with `float_roundtrip`, so a reload reproduces identical arrays.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::SpectraSet;
use crate::error::AppError;

pub const SNAPSHOT_TOOL: &str = "nova";
pub const SNAPSHOT_VERSION: u32 = 1;

/// A reloaded snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotFile {
    pub tool: String,
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub set: SpectraSet,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    tool: &'a str,
    format_version: u32,
    saved_at: DateTime<Utc>,
    set: &'a SpectraSet,
}

/// Write `set` to `path` as a JSON snapshot.
pub fn write_snapshot(path: &Path, set: &SpectraSet) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create snapshot '{}': {e}", path.display())))?;

    let snapshot = SnapshotRef {
        tool: SNAPSHOT_TOOL,
        format_version: SNAPSHOT_VERSION,
        saved_at: Utc::now(),
        set,
    };
    serde_json::to_writer_pretty(BufWriter::new(file), &snapshot)
        .map_err(|e| AppError::runtime(format!("Failed to write snapshot: {e}")))?;

    log::info!("saved {} spectra to {}", set.len(), path.display());
    Ok(())
}

/// Read a snapshot written by `write_snapshot`.
pub fn read_snapshot(path: &Path) -> Result<SnapshotFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open snapshot '{}': {e}", path.display())))?;
    let snapshot: SnapshotFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::input(format!("Invalid snapshot JSON: {e}")))?;

    if snapshot.format_version != SNAPSHOT_VERSION {
        return Err(AppError::input(format!(
            "Unsupported snapshot version {} (expected {SNAPSHOT_VERSION}).",
            snapshot.format_version
        )));
    }
    Ok(snapshot)
}

impl SpectraSet {
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        write_snapshot(path, self)
    }

    /// Reload a saved set, discarding the snapshot header.
    pub fn load_snapshot(path: &Path) -> Result<SpectraSet, AppError> {
        Ok(read_snapshot(path)?.set)
    }
}
