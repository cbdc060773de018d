//! Figures.
//!
//! Every routine renders into an in-memory SVG string through Plotters'
//! `SVGBackend`. A `Figure` can be inspected (tests, snapshot tooling) or
//! written to an output directory.
//!
//! - `spectra`: the stacked input spectra and the smoothing check
//! - `pca`: eigenspectra, reconstructions, the coefficient corner plot
//! - `embedding`: t-SNE scatter
//! - `ascii`: terminal preview of a single curve

use std::error::Error;
use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::{SneFamily, SneType};
use crate::error::AppError;

pub mod ascii;
pub mod embedding;
pub mod pca;
pub mod spectra;

pub use embedding::plot_tsne;
pub use pca::{plot_corner, plot_eigenspectra, plot_reconstructions};
pub use spectra::{plot_smoothing, plot_spectra};

pub(crate) type DrawResult = Result<(), Box<dyn Error>>;

/// A rendered figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    /// File stem used by `save` (no extension).
    pub name: String,
    pub title: String,
    pub size: (u32, u32),
    pub svg: String,
}

impl Figure {
    /// Write `<dir>/<name>.svg`, creating `dir` if needed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, AppError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| AppError::runtime(format!("Failed to create output dir '{}': {e}", dir.display())))?;
        let path = dir.join(format!("{}.svg", self.name));
        std::fs::write(&path, &self.svg)
            .map_err(|e| AppError::runtime(format!("Failed to write figure '{}': {e}", path.display())))?;
        log::info!("wrote {}", path.display());
        Ok(path)
    }
}

/// Render a figure: white background, caller draws, then present.
pub(crate) fn render<F>(name: &str, title: &str, size: (u32, u32), draw: F) -> Result<Figure, AppError>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> DrawResult,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| draw_error(title, e))?;
        draw(&root).map_err(|e| draw_error(title, e))?;
        root.present().map_err(|e| draw_error(title, e))?;
    }
    log::debug!("rendered figure '{name}' ({} bytes)", svg.len());
    Ok(Figure {
        name: name.to_string(),
        title: title.to_string(),
        size,
        svg,
    })
}

fn draw_error(title: &str, e: impl std::fmt::Display) -> AppError {
    AppError::runtime(format!("Failed to draw '{title}': {e}"))
}

/// Plot colour of a type: IIb green, Ib cyan, Ic red, IcBL black, others grey.
pub fn family_color(sne_type: SneType) -> RGBColor {
    match sne_type.family() {
        Some(family) => family_rgb(family),
        None => RGBColor(128, 128, 128),
    }
}

pub(crate) fn family_rgb(family: SneFamily) -> RGBColor {
    match family {
        SneFamily::IIb => GREEN,
        SneFamily::Ib => CYAN,
        SneFamily::Ic => RED,
        SneFamily::IcBL => BLACK,
    }
}

/// Split a sampled curve at missing values so gaps are not bridged.
pub(crate) fn segments(xs: &[f64], ys: &[f64]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (&x, &y) in xs.iter().zip(ys) {
        if x.is_finite() && y.is_finite() {
            current.push((x, y));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Min/max of the finite values, widened by `pad` on both sides.
///
/// Falls back to `0..1` when nothing is finite and widens a zero-width range.
pub(crate) fn padded_range(values: impl IntoIterator<Item = f64>, pad: f64) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return 0.0..1.0;
    }
    let (lo, hi) = (lo - pad, hi + pad);
    if hi > lo { lo..hi } else { (lo - 1.0)..(hi + 1.0) }
}
