//! The analysis pipeline shared by `nova run` and the integration tests.
//!
//! load -> smooth IcBL -> preprocess -> rebin -> name filter -> PCA -> figures
//!
//! Everything here is in memory; writing figures, snapshots and exports is
//! left to the caller.

use crate::dataset::{SmoothingResult, SpectraSet};
use crate::domain::{PlotConfig, RunConfig, SneFamily};
use crate::error::AppError;
use crate::io::ingest::SkippedFile;
use crate::math::TsneParams;
use crate::plot::{self, Figure};

/// All computed outputs of a single `nova run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub set: SpectraSet,
    pub files_read: usize,
    pub skipped: Vec<SkippedFile>,
    /// Present when IcBL smoothing was requested.
    pub smoothing: Option<SmoothingResult>,
    pub figures: Vec<Figure>,
}

/// Execute the full pipeline.
pub fn run_pipeline(config: &RunConfig) -> Result<RunOutput, AppError> {
    let ingested = SpectraSet::load(&config.catalog_dir, &config.selection)?;
    let mut set = ingested.set;
    log::info!(
        "loaded {} spectra from {} files ({} skipped)",
        set.len(),
        ingested.files_read,
        ingested.skipped.len()
    );

    let mut figures = Vec::new();
    let smoothing = match config.smooth_icbl {
        Some(velocity) => {
            let result = set.smooth_family(SneFamily::IcBL, velocity)?;
            // Drawn now, while the rows still sit on the loaded grid.
            if !result.is_empty() {
                figures.push(plot::plot_smoothing(
                    &set.wavelengths,
                    &result,
                    &set.selection.window_label(),
                )?);
            }
            Some(result)
        }
        None => None,
    };

    set.preprocess()?;
    set.rebin(config.rebin)?;

    if !config.names.is_empty() {
        for name in &config.names {
            if !set.records.iter().any(|r| &r.name == name) {
                log::warn!("requested object '{name}' is not in the loaded set");
            }
        }
        let mask = set.names_mask(&config.names);
        set.apply_mask(&mask, false)?;
    }

    set.calculate_pca()?;

    figures.extend(render_figures(&set, &config.plots)?);

    Ok(RunOutput {
        set,
        files_read: ingested.files_read,
        skipped: ingested.skipped,
        smoothing,
        figures,
    })
}

/// Render every figure `plots` asks for from an analysed set.
pub fn render_figures(set: &SpectraSet, plots: &PlotConfig) -> Result<Vec<Figure>, AppError> {
    let basis = set.pca()?;
    let mut figures = vec![plot::plot_spectra(set, plots.spectra_alpha)?];

    if plots.eigen_show > 0 {
        figures.push(plot::plot_eigenspectra(set, plots.eigen_show)?);
    }
    if plots.reconstructions > 0 {
        figures.extend(plot::plot_reconstructions(
            set,
            plots.reconstructions,
            &plots.reconstruction_components,
            plots.seed,
        )?);
    }
    if plots.corner_components >= 2 && basis.n_components() >= 2 {
        figures.push(plot::plot_corner(set, plots.corner_components)?);
    }
    if plots.tsne_components > 0 {
        let params = TsneParams {
            seed: plots.seed,
            ..TsneParams::default()
        };
        figures.push(plot::plot_tsne(set, plots.tsne_components, &params)?);
    }

    log::info!("rendered {} figures", figures.len());
    Ok(figures)
}
