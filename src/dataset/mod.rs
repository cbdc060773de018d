//! The analysis container.
//!
//! `SpectraSet` owns everything the pipeline produces: the shared wavelength
//! grid, one `SpectrumRecord` per object, and (after `calculate_pca`) the PCA
//! basis. It is populated once by the catalog loader and then mutated in place:
//!
//! load -> smooth -> preprocess -> rebin -> calculate_pca -> plot
//!
//! Per-object attributes all live on the record, so masking keeps them aligned.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{LoadSelection, PcaBasis, SpectrumRecord};
use crate::error::AppError;
use crate::io::ingest::{IngestedCatalog, load_catalog};
use crate::math::{TsneParams, embed, fit_pca, nan_column_mean, reconstruct};

pub mod mask;
pub mod normalize;
pub mod smooth;

pub use smooth::SmoothingResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectraSet {
    pub catalog_dir: PathBuf,
    pub selection: LoadSelection,
    pub wavelengths: Vec<f64>,
    pub records: Vec<SpectrumRecord>,
    #[serde(default)]
    pub pca: Option<PcaBasis>,
}

impl SpectraSet {
    pub fn new(catalog_dir: PathBuf, selection: LoadSelection) -> Self {
        Self {
            catalog_dir,
            selection,
            wavelengths: Vec::new(),
            records: Vec::new(),
            pca: None,
        }
    }

    /// Load from a SNID catalog directory.
    pub fn load(catalog_dir: &Path, selection: &LoadSelection) -> Result<IngestedCatalog, AppError> {
        load_catalog(catalog_dir, selection)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Row-major view of the flux matrix.
    pub fn flux_rows(&self) -> Vec<&[f64]> {
        self.records.iter().map(|r| r.flux.as_slice()).collect()
    }

    /// Row-major view of the coefficient matrix.
    pub fn coefficient_rows(&self) -> Result<Vec<&[f64]>, AppError> {
        self.records
            .iter()
            .map(|r| {
                r.coefficients
                    .as_deref()
                    .ok_or_else(|| AppError::data(format!("No PCA coefficients for {}; run PCA first.", r.name)))
            })
            .collect()
    }

    pub fn pca(&self) -> Result<&PcaBasis, AppError> {
        self.pca
            .as_ref()
            .ok_or_else(|| AppError::data("No PCA basis; run PCA first."))
    }

    /// NaN-aware mean spectrum over the current rows.
    pub fn sample_mean(&self) -> Vec<f64> {
        nan_column_mean(&self.flux_rows())
    }

    /// Fit PCA over the current flux matrix and store basis + coefficients.
    pub fn calculate_pca(&mut self) -> Result<(), AppError> {
        let fit = fit_pca(&self.flux_rows())?;
        for (record, coeffs) in self.records.iter_mut().zip(fit.coefficients) {
            record.coefficients = Some(coeffs);
        }
        log::info!(
            "PCA: {} components, first explains {:.3}",
            fit.basis.n_components(),
            fit.basis.explained_variance_ratio.first().copied().unwrap_or(0.0)
        );
        self.pca = Some(fit.basis);
        Ok(())
    }

    /// Reconstruct row `index` from the sample mean and its first `n_components` components.
    pub fn reconstruct(&self, index: usize, n_components: usize) -> Result<Vec<f64>, AppError> {
        let basis = self.pca()?;
        let record = self
            .records
            .get(index)
            .ok_or_else(|| AppError::input(format!("No spectrum at index {index}.")))?;
        let mean = self.sample_mean();
        Ok(reconstruct(basis, &mean, &record.flux, n_components))
    }

    /// t-SNE of the first `n_components` PCA coefficients of every row.
    pub fn embed(&self, n_components: usize, params: &TsneParams) -> Result<Vec<[f64; 2]>, AppError> {
        if n_components == 0 {
            return Err(AppError::input("t-SNE needs at least one PCA component."));
        }
        let rows = self.coefficient_rows()?;
        let leading: Vec<&[f64]> = rows.iter().map(|r| &r[..n_components.min(r.len())]).collect();
        embed(&leading, params)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::SneType;

    pub(crate) fn record(name: &str, sne_type: SneType, flux: Vec<f64>) -> SpectrumRecord {
        SpectrumRecord {
            name: name.to_string(),
            sne_type,
            phase: 15.0,
            data_row: 10,
            phase_column: 0,
            flux,
            norm: None,
            coefficients: None,
        }
    }

    pub(crate) fn small_set() -> SpectraSet {
        let mut set = SpectraSet::new(PathBuf::from("catalog"), LoadSelection::default());
        set.wavelengths = vec![4000.0, 4100.0, 4200.0, 4300.0, 4400.0, 4500.0];
        let rows = [
            ("sn_a", SneType::new(2, 4), vec![1.0, 2.0, 3.0, 2.0, 1.0, 0.5]),
            ("sn_b", SneType::new(2, 2), vec![0.5, 1.0, 2.5, 3.0, 2.0, 1.0]),
            ("sn_c", SneType::new(3, 2), vec![2.0, 1.0, 0.5, 1.5, 3.0, 2.0]),
            ("sn_d", SneType::new(3, 4), vec![1.5, 1.5, 2.0, 2.5, 1.0, 3.0]),
            ("sn_e", SneType::new(3, 1), vec![3.0, 2.5, 1.0, 0.5, 1.0, 1.5]),
        ];
        for (name, t, flux) in rows {
            set.records.push(record(name, t, flux));
        }
        set
    }

    #[test]
    fn pca_stores_basis_and_per_row_coefficients() {
        let mut set = small_set();
        set.preprocess().unwrap();
        set.calculate_pca().unwrap();

        let basis = set.pca().unwrap();
        assert_eq!(basis.components[0].len(), set.wavelengths.len());
        let coeffs = set.coefficient_rows().unwrap();
        assert_eq!(coeffs.len(), set.len());
        assert!(coeffs.iter().all(|c| c.len() == basis.n_components()));
    }

    #[test]
    fn reconstruction_with_every_component_is_exact() {
        let mut set = small_set();
        set.preprocess().unwrap();
        set.calculate_pca().unwrap();
        let n = set.pca().unwrap().n_components();
        let rec = set.reconstruct(2, n).unwrap();
        for (a, b) in rec.iter().zip(&set.records[2].flux) {
            assert!((a - b).abs() < 1e-8);
        }
        assert_eq!(set.reconstruct(2, 0).unwrap(), set.sample_mean());
    }

    #[test]
    fn analysis_steps_require_pca() {
        let set = small_set();
        assert_eq!(set.reconstruct(0, 1).unwrap_err().exit_code(), 3);
        assert_eq!(set.embed(2, &TsneParams::default()).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn embedding_has_one_point_per_row() {
        let mut set = small_set();
        set.preprocess().unwrap();
        set.calculate_pca().unwrap();
        let params = TsneParams { n_iter: 200, ..TsneParams::default() };
        let y = set.embed(3, &params).unwrap();
        assert_eq!(y.len(), set.len());
    }
}
