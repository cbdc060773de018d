//! SNID catalog ingest.
//!
//! This module turns a directory of SNID template files (`*.lnw`) into an
//! index-aligned `SpectraSet`: one flux vector per object, all on a shared
//! wavelength grid, each tagged with its type code and selected phase.
//!
//! Template layout (whitespace-separated):
//!
//! ```text
//!    9 1024   2501.69  10000.00   1   sn1994I   Ic-norm   3   2     <- header; last two = type, subtype
//!    ... spline knot block ...
//!    0     -5.94    -0.94     2.06 ...                              <- phase row; first = phase kind
//!    2501.69   0.000   0.000   0.000 ...                            <- first data row (marker)
//!    2508.40   ...
//! ```
//!
//! Design goals:
//! - **Skip, don't fail** on individual files: a missing marker is skipped
//!   quietly, an unreadable or malformed file is skipped with a warning
//! - **Deterministic behavior**: files are visited in name order
//! - **Separation of concerns**: no normalization here

use std::fs;
use std::path::Path;

use crate::dataset::SpectraSet;
use crate::domain::{LoadSelection, PhaseKind, SneType, SpectrumRecord};
use crate::error::AppError;

/// Catalog file extension.
pub const TEMPLATE_EXTENSION: &str = "lnw";

/// Relative tolerance when comparing an object's grid with the shared grid.
const GRID_TOL: f64 = 1e-6;

/// A parsed template, restricted to what the loader needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub sne_type: SneType,
    /// Raw phase-kind code from the phase row.
    pub phase_kind_code: i64,
    pub phases: Vec<f64>,
    /// Line index of the first data row.
    pub data_row: usize,
    /// Data rows: wavelength followed by one flux per phase.
    pub rows: Vec<Vec<f64>>,
}

impl Template {
    pub fn phase_kind(&self) -> Option<PhaseKind> {
        PhaseKind::from_code(self.phase_kind_code)
    }

    /// `(wavelength, flux)` pairs for one phase column.
    pub fn column(&self, phase_column: usize) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|r| Some((*r.first()?, *r.get(phase_column + 1)?)))
            .collect()
    }
}

/// Why a file did not make it into the set.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Ingest output: the aligned set + what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedCatalog {
    pub set: SpectraSet,
    pub files_read: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Index and value of the tabulated phase closest to `target`.
///
/// Ties resolve to the first match. Non-finite phases are never chosen.
/// Returns `None` when no finite phase is tabulated.
pub fn find_closest_phase(phases: &[f64], target: f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &p) in phases.iter().enumerate() {
        if !p.is_finite() {
            continue;
        }
        let d = (p - target).abs();
        match best {
            Some((b, _)) if d >= (phases[b] - target).abs() => {}
            _ => best = Some((idx, p)),
        }
    }
    best
}

/// Read the type code from the header line without parsing the rest.
pub fn parse_type_code(header: &str) -> Result<SneType, String> {
    let tokens: Vec<&str> = header.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err("Header has fewer than two tokens.".to_string());
    }
    let main = tokens[tokens.len() - 2]
        .parse::<u8>()
        .map_err(|e| format!("Invalid type code in header: {e}"))?;
    let sub = tokens[tokens.len() - 1]
        .parse::<u8>()
        .map_err(|e| format!("Invalid subtype code in header: {e}"))?;
    Ok(SneType::new(main, sub))
}

/// Parse a template file's text.
///
/// `Ok(None)` means the wavelength marker was not found (not an error).
pub fn parse_template(text: &str, marker: &str) -> Result<Option<Template>, String> {
    let lines: Vec<&str> = text.lines().collect();
    let header = lines.first().ok_or_else(|| "Empty file.".to_string())?;
    let sne_type = parse_type_code(header)?;

    // The header itself carries the first wavelength, so the search starts below it.
    let Some(data_row) = lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, line)| line.split_whitespace().next() == Some(marker))
        .map(|(idx, _)| idx)
    else {
        return Ok(None);
    };

    if data_row < 2 {
        return Err("Phase row missing above the first data row.".to_string());
    }

    let mut phase_tokens = lines[data_row - 1].split_whitespace();
    let phase_kind_code = phase_tokens
        .next()
        .ok_or_else(|| "Empty phase row.".to_string())?
        .parse::<i64>()
        .map_err(|e| format!("Invalid phase kind: {e}"))?;
    let phases = phase_tokens
        .map(|t| t.parse::<f64>().map_err(|e| format!("Invalid phase '{t}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    if phases.is_empty() {
        return Err("Phase row lists no phases.".to_string());
    }
    if let Some(bad) = phases.iter().find(|p| !p.is_finite()) {
        return Err(format!("Non-finite phase {bad} in the phase row."));
    }

    let mut rows = Vec::new();
    for (offset, line) in lines[data_row..].iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|t| t.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Line {}: {e}", data_row + offset + 1))?;
        if row.len() < phases.len() + 1 {
            return Err(format!(
                "Line {}: expected {} columns, found {}.",
                data_row + offset + 1,
                phases.len() + 1,
                row.len()
            ));
        }
        rows.push(row);
    }

    Ok(Some(Template {
        sne_type,
        phase_kind_code,
        phases,
        data_row,
        rows,
    }))
}

/// Load every matching template in `dir` into an aligned set.
pub fn load_catalog(dir: &Path, selection: &LoadSelection) -> Result<IngestedCatalog, AppError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::input(format!("Failed to read catalog directory '{}': {e}", dir.display()))
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION))
        .collect();
    paths.sort();

    let mut set = SpectraSet::new(dir.to_path_buf(), selection.clone());
    let mut skipped = Vec::new();
    let mut files_read = 0usize;

    for path in &paths {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                skipped.push(SkippedFile { name, reason: format!("unreadable: {e}") });
                continue;
            }
        };
        files_read += 1;

        // Cheap type check first so unrelated templates are never parsed in full.
        let header = text.lines().next().unwrap_or_default();
        match parse_type_code(header) {
            Ok(t) if !selection.accepts_type(t) => continue,
            Ok(_) => {}
            Err(reason) => {
                log::warn!("skipping {name}: {reason}");
                skipped.push(SkippedFile { name, reason });
                continue;
            }
        }

        let template = match parse_template(&text, &selection.marker) {
            Ok(Some(t)) => t,
            Ok(None) => {
                log::debug!("skipping {name}: no '{}' data row", selection.marker);
                skipped.push(SkippedFile {
                    name,
                    reason: format!("wavelength marker '{}' not found", selection.marker),
                });
                continue;
            }
            Err(reason) => {
                log::warn!("skipping {name}: {reason}");
                skipped.push(SkippedFile { name, reason });
                continue;
            }
        };

        match select_spectrum(&name, &template, selection) {
            Ok((record, grid)) => {
                if set.records.is_empty() {
                    set.wavelengths = grid;
                } else if !same_grid(&set.wavelengths, &grid) {
                    log::warn!("skipping {name}: wavelength grid differs from the shared grid");
                    skipped.push(SkippedFile {
                        name,
                        reason: "wavelength grid differs from the shared grid".to_string(),
                    });
                    continue;
                }
                set.records.push(record);
            }
            Err(reason) => {
                log::debug!("skipping {name}: {reason}");
                skipped.push(SkippedFile { name, reason });
            }
        }
    }

    if set.records.is_empty() {
        log::warn!("no spectra matched the selection in '{}'", dir.display());
    } else {
        log::info!(
            "loaded {} spectra ({} wavelengths) from {} files",
            set.len(),
            set.wavelengths.len(),
            files_read
        );
    }

    Ok(IngestedCatalog {
        set,
        files_read,
        skipped,
    })
}

/// Re-read the full-range `(wavelength, flux)` column a record was loaded from.
///
/// The file is `<catalog_dir>/<name>.lnw`; its first data row and phase column
/// must still match what the record was built from.
pub fn read_phase_column(
    catalog_dir: &Path,
    record: &SpectrumRecord,
    marker: &str,
) -> Result<Vec<(f64, f64)>, AppError> {
    let path = catalog_dir.join(format!("{}.{TEMPLATE_EXTENSION}", record.name));
    let text = fs::read_to_string(&path)
        .map_err(|e| AppError::input(format!("Failed to re-read '{}': {e}", path.display())))?;
    let template = parse_template(&text, marker)
        .map_err(|reason| AppError::data(format!("'{}': {reason}", path.display())))?
        .ok_or_else(|| {
            AppError::data(format!("'{}': wavelength marker '{marker}' not found", path.display()))
        })?;
    if template.data_row != record.data_row || record.phase_column >= template.phases.len() {
        return Err(AppError::data(format!(
            "'{}' no longer matches the loaded spectrum of {}.",
            path.display(),
            record.name
        )));
    }
    Ok(template.column(record.phase_column))
}

/// Pick the nearest phase column and apply the wavelength / phase filters.
fn select_spectrum(
    name: &str,
    template: &Template,
    selection: &LoadSelection,
) -> Result<(SpectrumRecord, Vec<f64>), String> {
    let (phase_column, phase) = find_closest_phase(&template.phases, selection.phase)
        .ok_or_else(|| "no tabulated phases".to_string())?;

    if template.phase_kind() != Some(selection.phase_kind) {
        return Err(format!(
            "phase kind {} does not match requested {}",
            template.phase_kind_code,
            selection.phase_kind.code()
        ));
    }
    if !selection.accepts_phase(phase) {
        return Err(format!(
            "nearest phase {phase} outside window {}",
            selection.window_label()
        ));
    }

    let (grid, flux): (Vec<f64>, Vec<f64>) = template
        .column(phase_column)
        .into_iter()
        .filter(|(w, _)| selection.accepts_wavelength(*w))
        .unzip();
    if grid.is_empty() {
        return Err("no samples inside the wavelength range".to_string());
    }

    Ok((
        SpectrumRecord {
            name: name.to_string(),
            sne_type: template.sne_type,
            phase,
            data_row: template.data_row,
            phase_column,
            flux,
            norm: None,
            coefficients: None,
        },
        grid,
    ))
}

fn same_grid(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= GRID_TOL * x.abs().max(1.0))
}
