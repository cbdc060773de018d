//! Row normalization and wavelength rebinning.

use crate::dataset::SpectraSet;
use crate::domain::RowNorm;
use crate::error::AppError;
use crate::math::{nan_mean, nan_std};

impl SpectraSet {
    /// Mark zero flux as missing, then scale every row to zero mean and unit std.
    ///
    /// Statistics ignore missing samples. The row mean/std are kept on each
    /// record. A row without variance is rejected before anything is modified.
    pub fn preprocess(&mut self) -> Result<(), AppError> {
        let mut norms = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let cleaned: Vec<f64> = record.flux.iter().map(|&v| missing_if_zero(v)).collect();
            let mean = nan_mean(&cleaned);
            let std = nan_std(&cleaned);
            if !(std.is_finite() && std > 0.0) {
                return Err(AppError::runtime(format!(
                    "Degenerate variance in {} (std={std}); cannot normalize.",
                    record.name
                )));
            }
            norms.push(RowNorm { mean, std });
        }

        for (record, norm) in self.records.iter_mut().zip(norms) {
            for v in record.flux.iter_mut() {
                *v = (missing_if_zero(*v) - norm.mean) / norm.std;
            }
            record.norm = Some(norm);
        }
        Ok(())
    }

    /// Average every `factor` adjacent wavelength samples.
    ///
    /// Applies to the grid and every row. Samples past the last whole bin are
    /// dropped. An existing PCA basis no longer matches the grid and is cleared.
    pub fn rebin(&mut self, factor: usize) -> Result<(), AppError> {
        if factor == 0 {
            return Err(AppError::input("Rebin factor must be >= 1."));
        }
        if factor == 1 {
            return Ok(());
        }
        if self.records.is_empty() {
            log::debug!("rebin: no spectra loaded, nothing to bin");
            return Ok(());
        }
        let bins = self.wavelengths.len() / factor;
        if bins == 0 {
            return Err(AppError::input(format!(
                "Rebin factor {factor} exceeds the grid length {}.",
                self.wavelengths.len()
            )));
        }
        let dropped = self.wavelengths.len() - bins * factor;
        if dropped > 0 {
            log::info!("rebin: dropping {dropped} trailing samples that do not fill a bin");
        }

        self.wavelengths = bin_means(&self.wavelengths, factor, bins);
        for record in self.records.iter_mut() {
            record.flux = bin_means(&record.flux, factor, bins);
        }

        if self.pca.take().is_some() {
            log::info!("rebin: cleared PCA basis and coefficients");
            for record in self.records.iter_mut() {
                record.coefficients = None;
            }
        }
        Ok(())
    }
}

fn missing_if_zero(v: f64) -> f64 {
    if v == 0.0 { f64::NAN } else { v }
}

fn bin_means(values: &[f64], factor: usize, bins: usize) -> Vec<f64> {
    values
        .chunks_exact(factor)
        .take(bins)
        .map(nan_mean)
        .collect()
}
