//! Velocity smoothing of broad-lined spectra.
//!
//! Broad-lined Ic features are blended by ejecta velocities of tens of
//! thousands of km/s, so comparing them with other types is easier after
//! smoothing the narrow structure away. We convolve with a Gaussian whose width
//! is a velocity: in log-wavelength a Doppler shift `v` is a constant offset
//! `ln(1 + v/c) ≈ v/c`, so the kernel has `σ = v / c` in `ln λ`.
//!
//! Each spectrum is re-read from its template over the full tabulated range,
//! smoothed there, and only then cut to the loaded wavelength window, so the
//! kernel is never truncated at the window edges.
//!
//! Missing samples (NaN, or the zero padding SNID uses outside an object's
//! coverage) are excluded from each weighted average and stay missing.

use crate::dataset::SpectraSet;
use crate::domain::SneFamily;
use crate::error::AppError;
use crate::io::ingest::read_phase_column;

/// Speed of light (km/s).
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Kernel support in units of σ.
const KERNEL_SIGMAS: f64 = 4.0;

/// Rows touched by a smoothing pass, for side-by-side verification plots.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingResult {
    pub names: Vec<String>,
    pub before: Vec<Vec<f64>>,
    pub after: Vec<Vec<f64>>,
}

impl SmoothingResult {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl SpectraSet {
    /// Smooth every spectrum of `family` in place.
    ///
    /// Runs on loaded flux: before `preprocess` and before `rebin`. Nothing is
    /// modified unless every matching spectrum could be smoothed.
    pub fn smooth_family(&mut self, family: SneFamily, velocity_km_s: f64) -> Result<SmoothingResult, AppError> {
        if !(velocity_km_s.is_finite() && velocity_km_s > 0.0) {
            return Err(AppError::input(format!(
                "Smoothing velocity must be finite and > 0 (got {velocity_km_s})."
            )));
        }
        let sigma = velocity_km_s / SPEED_OF_LIGHT_KM_S;

        let mut updates = Vec::new();
        for (idx, record) in self.records.iter().enumerate() {
            if record.sne_type.family() != Some(family) {
                continue;
            }
            if record.norm.is_some() {
                return Err(AppError::data(format!(
                    "{} is already normalized; smoothing runs on loaded flux.",
                    record.name
                )));
            }

            let (grid, flux): (Vec<f64>, Vec<f64>) =
                read_phase_column(&self.catalog_dir, record, &self.selection.marker)?
                    .into_iter()
                    .unzip();
            let ln_grid = log_grid(&grid).map_err(|reason| AppError::data(format!("{}: {reason}", record.name)))?;
            let smoothed: Vec<f64> = grid
                .iter()
                .zip(gaussian_smooth(&ln_grid, &flux, sigma))
                .filter(|(w, _)| self.selection.accepts_wavelength(**w))
                .map(|(_, v)| v)
                .collect();
            if smoothed.len() != record.flux.len() {
                return Err(AppError::data(format!(
                    "{}: {} samples in range after re-reading, the set holds {} (smoothing must precede rebinning).",
                    record.name,
                    smoothed.len(),
                    record.flux.len()
                )));
            }
            updates.push((idx, smoothed));
        }

        let mut result = SmoothingResult {
            names: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
        };
        for (idx, smoothed) in updates {
            let record = &mut self.records[idx];
            result.names.push(record.name.clone());
            result.before.push(std::mem::replace(&mut record.flux, smoothed.clone()));
            result.after.push(smoothed);
        }

        log::info!(
            "smoothed {} {} spectra at {velocity_km_s} km/s",
            result.names.len(),
            family.label()
        );
        Ok(result)
    }
}

/// `ln λ` of a strictly positive, strictly increasing grid.
fn log_grid(grid: &[f64]) -> Result<Vec<f64>, String> {
    if grid.iter().any(|&w| !(w.is_finite() && w > 0.0)) {
        return Err("wavelength grid must be strictly positive".to_string());
    }
    if grid.windows(2).any(|w| w[1] <= w[0]) {
        return Err("wavelength grid must be strictly increasing".to_string());
    }
    Ok(grid.iter().map(|w| w.ln()).collect())
}

/// Gaussian-weighted average of `values` over an ascending `grid` with width `sigma`.
///
/// Missing samples (NaN or exactly zero) get no weight and are returned unchanged.
pub fn gaussian_smooth(grid: &[f64], values: &[f64], sigma: f64) -> Vec<f64> {
    let reach = KERNEL_SIGMAS * sigma;
    let mut out = Vec::with_capacity(values.len());
    let mut lo = 0usize;

    for (j, &center) in grid.iter().enumerate() {
        if is_missing(values[j]) {
            out.push(values[j]);
            continue;
        }
        while lo < j && grid[lo] < center - reach {
            lo += 1;
        }
        let mut weighted = 0.0;
        let mut weight = 0.0;
        for k in lo..grid.len() {
            let d = grid[k] - center;
            if d > reach {
                break;
            }
            let v = values[k];
            if is_missing(v) {
                continue;
            }
            let w = (-0.5 * (d / sigma) * (d / sigma)).exp();
            weighted += w * v;
            weight += w;
        }
        out.push(if weight > 0.0 { weighted / weight } else { values[j] });
    }
    out
}

fn is_missing(v: f64) -> bool {
    v.is_nan() || v == 0.0
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::dataset::tests::small_set;
    use crate::domain::LoadSelection;
    use crate::io::ingest::tests::{scratch_dir, template_text};

    const VELOCITY: f64 = 60_000.0;

    /// IcBL and Ic templates on the 1000 A test grid, one phase at 14 days.
    fn catalog(tag: &str, icbl_flux: impl Fn(usize, usize) -> f64) -> (std::path::PathBuf, SpectraSet) {
        let dir = scratch_dir(tag);
        fs::write(dir.join("sn1998bw.lnw"), template_text(3, 4, 0, &[14.0], icbl_flux, 9)).unwrap();
        fs::write(
            dir.join("sn1994I.lnw"),
            template_text(3, 2, 0, &[14.0], |k, _| 2.0 + (k % 3) as f64, 9),
        )
        .unwrap();
        let set = SpectraSet::load(&dir, &LoadSelection::default()).unwrap().set;
        (dir, set)
    }

    fn ln(grid: &[f64]) -> Vec<f64> {
        grid.iter().map(|w| w.ln()).collect()
    }

    fn cleanup(dir: &Path) {
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn constant_spectrum_is_unchanged() {
        let grid: Vec<f64> = (0..50).map(|i| (4000.0 + 10.0 * i as f64).ln()).collect();
        let values = vec![3.5; 50];
        let out = gaussian_smooth(&grid, &values, 3000.0 / SPEED_OF_LIGHT_KM_S);
        assert!(out.iter().all(|v| (v - 3.5).abs() < 1e-12));
    }

    #[test]
    fn smoothing_flattens_a_spike_and_keeps_missing_samples() {
        let grid: Vec<f64> = (0..41).map(|i| (5000.0 + 5.0 * i as f64).ln()).collect();
        let mut values = vec![1.0; 41];
        values[20] = 10.0;
        values[5] = f64::NAN;
        let out = gaussian_smooth(&grid, &values, 3000.0 / SPEED_OF_LIGHT_KM_S);
        assert!(out[20] < 10.0 && out[20] > 1.0);
        assert!(out[19] > 1.0);
        assert!(out[5].is_nan());
        assert!(out.iter().enumerate().all(|(i, v)| i == 5 || v.is_finite()));
    }

    #[test]
    fn zero_padding_is_not_averaged_in() {
        let grid: Vec<f64> = (0..12).map(|i| (4000.0 + 20.0 * i as f64).ln()).collect();
        let values = [0.0, 0.0, 0.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 0.0, 0.0, 0.0];
        let out = gaussian_smooth(&grid, &values, 3000.0 / SPEED_OF_LIGHT_KM_S);
        for (v, o) in values.iter().zip(&out) {
            if *v == 0.0 {
                assert_eq!(*o, 0.0);
            } else {
                assert!((o - 5.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn unsorted_grid_does_not_panic() {
        let grid = [(5000.0f64).ln(), (4000.0f64).ln(), (6000.0f64).ln()];
        let out = gaussian_smooth(&grid, &[1.0, 2.0, 3.0], 0.5);
        assert_eq!(out.len(), 3);
        assert_eq!(log_grid(&[5000.0, 4000.0]).unwrap_err(), "wavelength grid must be strictly increasing");
        assert!(log_grid(&[0.0, 4000.0]).is_err());
    }

    #[test]
    fn only_the_requested_family_changes() {
        let (dir, mut set) = catalog("smooth-family", |k, _| 1.0 + (k * k) as f64);
        let before = set.clone();
        let result = set.smooth_family(SneFamily::IcBL, VELOCITY).unwrap();

        assert_eq!(result.names, vec!["sn1998bw".to_string()]);
        let idx = set.records.iter().position(|r| r.name == "sn1998bw").unwrap();
        assert_eq!(result.before[0], before.records[idx].flux);
        assert_eq!(result.after[0], set.records[idx].flux);
        assert_ne!(set.records[idx].flux, before.records[idx].flux);
        assert_eq!(set.records[1 - idx], before.records[1 - idx]);
        assert_eq!(set.wavelengths, before.wavelengths);
        cleanup(&dir);
    }

    #[test]
    fn window_edges_see_flux_outside_the_window() {
        let (dir, mut set) = catalog("smooth-edges", |k, _| 1.0 + (k * k) as f64);
        let idx = set.records.iter().position(|r| r.name == "sn1998bw").unwrap();
        let cut_first = gaussian_smooth(&ln(&set.wavelengths), &set.records[idx].flux, VELOCITY / SPEED_OF_LIGHT_KM_S);

        let result = set.smooth_family(SneFamily::IcBL, VELOCITY).unwrap();
        let after = &result.after[0];
        assert_eq!(after.len(), cut_first.len());
        assert!((after[0] - cut_first[0]).abs() > 1e-3, "{} vs {}", after[0], cut_first[0]);
        let last = after.len() - 1;
        assert!((after[last] - cut_first[last]).abs() > 1e-3, "{} vs {}", after[last], cut_first[last]);
        cleanup(&dir);
    }

    #[test]
    fn zero_padded_samples_stay_missing_through_preprocess() {
        // k = 2 is 4501.69 A, the first sample inside the default window.
        let (dir, mut set) = catalog("smooth-padding", |k, _| if k <= 2 { 0.0 } else { 3.0 + k as f64 });
        let idx = set.records.iter().position(|r| r.name == "sn1998bw").unwrap();
        set.smooth_family(SneFamily::IcBL, VELOCITY).unwrap();
        assert_eq!(set.records[idx].flux[0], 0.0);

        set.preprocess().unwrap();
        assert!(set.records[idx].flux[0].is_nan());
        assert!(set.records[idx].flux[1..].iter().all(|v| v.is_finite()));
        cleanup(&dir);
    }

    #[test]
    fn smoothing_needs_loaded_flux_on_the_loaded_grid() {
        let (dir, set) = catalog("smooth-order", |k, _| 1.0 + k as f64);

        let mut normalized = set.clone();
        normalized.preprocess().unwrap();
        assert_eq!(normalized.smooth_family(SneFamily::IcBL, VELOCITY).unwrap_err().exit_code(), 3);

        let mut rebinned = set.clone();
        rebinned.rebin(2).unwrap();
        let before = rebinned.clone();
        assert_eq!(rebinned.smooth_family(SneFamily::IcBL, VELOCITY).unwrap_err().exit_code(), 3);
        assert_eq!(rebinned, before);
        cleanup(&dir);
    }

    #[test]
    fn missing_template_file_is_an_input_error() {
        let mut set = small_set();
        assert_eq!(set.smooth_family(SneFamily::IcBL, 20_000.0).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn rejects_non_positive_velocity() {
        let mut set = small_set();
        assert_eq!(set.smooth_family(SneFamily::IcBL, 0.0).unwrap_err().exit_code(), 2);
    }
}
