//! Formatted terminal output.
//!
//! Formatting lives here so the loader and the math stay free of presentation
//! concerns, and output changes stay localized.

use std::collections::BTreeMap;

use crate::dataset::SpectraSet;
use crate::domain::SneFamily;
use crate::io::ingest::SkippedFile;

/// Dataset overview: selection, grid, per-type counts.
pub fn format_set_summary(set: &SpectraSet) -> String {
    let sel = &set.selection;
    let mut out = String::new();

    out.push_str("=== nova - stripped-envelope SN spectra PCA ===\n");
    out.push_str(&format!("Catalog: {}\n", set.catalog_dir.display()));
    out.push_str(&format!(
        "Phase: {} days ({:?}) | wavelength=({}, {})A\n",
        sel.window_label(),
        sel.phase_kind,
        sel.min_wavelength,
        sel.max_wavelength
    ));
    match (set.wavelengths.first(), set.wavelengths.last()) {
        (Some(lo), Some(hi)) => out.push_str(&format!(
            "Grid: n={} | [{lo:.2}, {hi:.2}]A\n",
            set.wavelengths.len()
        )),
        _ => out.push_str("Grid: empty\n"),
    }
    out.push_str(&format!("Spectra: n={}\n", set.len()));

    let mut by_type: BTreeMap<_, usize> = BTreeMap::new();
    for record in &set.records {
        *by_type.entry(record.sne_type).or_default() += 1;
    }
    if !by_type.is_empty() {
        out.push('\n');
        out.push_str(&format!("{:<12} {:<8} {:>6}\n", "type", "family", "count"));
        out.push_str(&format!("{:-<12} {:-<8} {:-<6}\n", "", "", ""));
        for (sne_type, count) in by_type {
            let family = sne_type.family().map_or("-", SneFamily::label);
            out.push_str(&format!("{:<12} {:<8} {count:>6}\n", sne_type.to_string(), family));
        }
    }
    out
}

/// Files read and skipped by the loader.
pub fn format_ingest_summary(files_read: usize, selected: usize, skipped: &[SkippedFile]) -> String {
    let mut out = format!(
        "Files: read={files_read} | selected={selected} | skipped={}\n",
        skipped.len()
    );
    for skip in skipped {
        out.push_str(&format!("  (skipped {}) {}\n", truncate(&skip.name, 32), skip.reason));
    }
    out
}

/// Explained variance per component (up to `max_rows`), or a note when PCA has not run.
pub fn format_pca_summary(set: &SpectraSet, max_rows: usize) -> String {
    let Some(basis) = set.pca.as_ref() else {
        return "PCA: not computed\n".to_string();
    };

    let mut out = format!("PCA: {} components\n", basis.n_components());
    out.push_str(&format!("{:>4} {:>10} {:>10}\n", "pc", "variance", "cumulative"));
    out.push_str(&format!("{:->4} {:->10} {:->10}\n", "", "", ""));
    for (k, (ratio, cum)) in basis
        .explained_variance_ratio
        .iter()
        .zip(&basis.cumulative_variance)
        .enumerate()
        .take(max_rows)
    {
        out.push_str(&format!("{k:>4} {ratio:>10.4} {cum:>10.4}\n"));
    }
    if basis.n_components() > max_rows {
        out.push_str(&format!("  ... {} more\n", basis.n_components() - max_rows));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
