//! Principal Component Analysis via SVD.
//!
//! Given `n` spectra on a shared grid of `m` wavelengths (rows of an `n × m`
//! matrix), we:
//!
//! - remove the column means (mean spectrum over objects)
//! - take the SVD `Xc = U Σ Vᵀ`; the rows of `Vᵀ` are the eigenspectra
//! - rank components by singular value and report `s_k² / Σ s²` as the
//!   explained-variance fraction
//!
//! Missing samples (NaN) are filled with 0 before the decomposition. After
//! preprocessing every row has zero mean, so 0 is the row's own mean level.
//!
//! Implementation choices:
//! - SVD rather than an eigen-decomposition of the covariance: the matrix is
//!   usually wide (few objects, many wavelengths), and the SVD never forms the
//!   `m × m` covariance.
//! - Each component is sign-fixed so its largest-magnitude loading is positive,
//!   which keeps plots and exports stable across runs.

use nalgebra::DMatrix;

use crate::domain::PcaBasis;
use crate::error::AppError;

/// Iteration cap for the SVD; generous for the matrix sizes we see.
const SVD_MAX_ITERS: usize = 10_000;

/// Basis plus the per-row projections.
#[derive(Debug, Clone)]
pub struct PcaFit {
    pub basis: PcaBasis,
    /// `coefficients[i][k]` = projection of row `i` onto component `k`.
    pub coefficients: Vec<Vec<f64>>,
}

/// Fit PCA over the given rows.
///
/// Coefficients are the projection of each (NaN-filled) row onto each component,
/// without removing the mean first.
pub fn fit_pca(rows: &[&[f64]]) -> Result<PcaFit, AppError> {
    let n = rows.len();
    if n < 2 {
        return Err(AppError::data(format!(
            "PCA needs at least 2 spectra (got {n})."
        )));
    }
    let m = rows[0].len();
    if m == 0 {
        return Err(AppError::data("PCA needs a non-empty wavelength grid."));
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != m) {
        return Err(AppError::input(format!(
            "Row {bad} has {} samples, expected {m}.",
            rows[bad].len()
        )));
    }

    let x = filled_matrix(rows);
    if x.iter().any(|v| !v.is_finite()) {
        return Err(AppError::runtime("PCA input contains non-finite values."));
    }

    let mean: Vec<f64> = (0..m).map(|j| x.column(j).sum() / n as f64).collect();
    let mut centered = x.clone();
    for j in 0..m {
        for i in 0..n {
            centered[(i, j)] -= mean[j];
        }
    }

    let svd = centered
        .try_svd(false, true, f64::EPSILON, SVD_MAX_ITERS)
        .ok_or_else(|| AppError::runtime("SVD did not converge."))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| AppError::runtime("SVD did not return right singular vectors."))?;
    let singular = svd.singular_values;

    let total: f64 = singular.iter().map(|s| s * s).sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(AppError::runtime(
            "Degenerate variance: all spectra are identical after centering.",
        ));
    }

    let mut order: Vec<usize> = (0..singular.len()).collect();
    order.sort_by(|&a, &b| singular[b].total_cmp(&singular[a]));

    let mut components = Vec::with_capacity(order.len());
    let mut ratios = Vec::with_capacity(order.len());
    for &k in &order {
        let mut comp: Vec<f64> = v_t.row(k).iter().copied().collect();
        fix_sign(&mut comp);
        components.push(comp);
        ratios.push(singular[k] * singular[k] / total);
    }

    let cumulative = ratios
        .iter()
        .scan(0.0, |acc, r| {
            *acc += r;
            Some(*acc)
        })
        .collect();

    let coefficients = (0..n)
        .map(|i| {
            components
                .iter()
                .map(|c| c.iter().enumerate().map(|(j, v)| v * x[(i, j)]).sum())
                .collect()
        })
        .collect();

    Ok(PcaFit {
        basis: PcaBasis {
            components,
            explained_variance_ratio: ratios,
            cumulative_variance: cumulative,
            mean,
        },
        coefficients,
    })
}

/// Coefficients of `spectrum − mean` on every component.
///
/// Missing samples contribute nothing.
pub fn project_centered(basis: &PcaBasis, mean: &[f64], spectrum: &[f64]) -> Vec<f64> {
    basis
        .components
        .iter()
        .map(|c| {
            c.iter()
                .zip(spectrum.iter().zip(mean))
                .map(|(v, (x, mu))| {
                    let d = x - mu;
                    if d.is_nan() { 0.0 } else { v * d }
                })
                .sum()
        })
        .collect()
}

/// Rebuild `spectrum` from `mean` plus its first `n_components` components.
///
/// `n_components = 0` returns the mean; values above the basis size are capped.
pub fn reconstruct(basis: &PcaBasis, mean: &[f64], spectrum: &[f64], n_components: usize) -> Vec<f64> {
    let coeffs = project_centered(basis, mean, spectrum);
    let n = n_components.min(basis.n_components());
    let mut out = mean.to_vec();
    for (c, comp) in coeffs.iter().zip(&basis.components).take(n) {
        for (o, v) in out.iter_mut().zip(comp) {
            *o += c * v;
        }
    }
    out
}

fn filled_matrix(rows: &[&[f64]]) -> DMatrix<f64> {
    let n = rows.len();
    let m = rows[0].len();
    DMatrix::from_fn(n, m, |i, j| {
        let v = rows[i][j];
        if v.is_nan() { 0.0 } else { v }
    })
}

fn fix_sign(component: &mut [f64]) {
    let pivot = component
        .iter()
        .copied()
        .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
    if pivot < 0.0 {
        for v in component.iter_mut() {
            *v = -*v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 2.0, 0.5, -1.0, 0.0],
            vec![0.5, 1.5, 1.0, -0.5, 0.2],
            vec![-1.0, 0.0, 2.0, 1.0, -0.3],
            vec![2.0, -1.0, 0.0, 0.5, 1.0],
            vec![0.0, 0.5, -1.5, 2.0, 0.4],
        ]
    }

    fn as_slices(rows: &[Vec<f64>]) -> Vec<&[f64]> {
        rows.iter().map(Vec::as_slice).collect()
    }

    #[test]
    fn variance_fractions_rank_and_sum_to_one() {
        let rows = sample_rows();
        let fit = fit_pca(&as_slices(&rows)).unwrap();
        let r = &fit.basis.explained_variance_ratio;

        for w in r.windows(2) {
            assert!(w[0] + 1e-12 >= w[1], "ratios not ranked: {r:?}");
        }
        let total: f64 = r.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        let last = *fit.basis.cumulative_variance.last().unwrap();
        assert!((last - 1.0).abs() < 1e-9);
    }

    #[test]
    fn components_are_orthonormal() {
        let rows = sample_rows();
        let fit = fit_pca(&as_slices(&rows)).unwrap();
        // Centering removes one rank, so only the leading n-1 carry variance.
        let comps = &fit.basis.components[..rows.len() - 1];
        for (a, ca) in comps.iter().enumerate() {
            for (b, cb) in comps.iter().enumerate() {
                let dot: f64 = ca.iter().zip(cb).map(|(x, y)| x * y).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-8, "dot({a},{b}) = {dot}");
            }
        }
    }

    #[test]
    fn full_reconstruction_recovers_rows() {
        let rows = sample_rows();
        let fit = fit_pca(&as_slices(&rows)).unwrap();
        let mean = fit.basis.mean.clone();
        for row in &rows {
            let rec = reconstruct(&fit.basis, &mean, row, fit.basis.n_components());
            for (a, b) in rec.iter().zip(row) {
                assert!((a - b).abs() < 1e-8);
            }
        }
        let only_mean = reconstruct(&fit.basis, &mean, &rows[0], 0);
        assert_eq!(only_mean, mean);
    }

    #[test]
    fn collinear_rows_have_one_component() {
        let rows: Vec<Vec<f64>> = (0..4)
            .map(|i| {
                let s = i as f64;
                vec![s, 2.0 * s, -s, 0.5 * s]
            })
            .collect();
        let fit = fit_pca(&as_slices(&rows)).unwrap();
        assert!(fit.basis.explained_variance_ratio[0] > 1.0 - 1e-9);
        // Largest loading is positive after sign fixing.
        let c0 = &fit.basis.components[0];
        let pivot = c0.iter().copied().fold(0.0_f64, |b, v| if v.abs() > b.abs() { v } else { b });
        assert!(pivot > 0.0);
    }

    #[test]
    fn coefficients_are_uncentered_projections() {
        let rows = sample_rows();
        let fit = fit_pca(&as_slices(&rows)).unwrap();
        let c0 = &fit.basis.components[0];
        let expected: f64 = rows[2].iter().zip(c0).map(|(x, v)| x * v).sum();
        assert!((fit.coefficients[2][0] - expected).abs() < 1e-10);
    }

    #[test]
    fn rejects_too_few_or_degenerate_rows() {
        let one = vec![vec![1.0, 2.0]];
        assert_eq!(fit_pca(&as_slices(&one)).unwrap_err().exit_code(), 3);

        let same = vec![vec![1.0, 2.0], vec![1.0, 2.0]];
        assert_eq!(fit_pca(&as_slices(&same)).unwrap_err().exit_code(), 4);
    }

    #[test]
    fn missing_samples_are_filled_with_zero() {
        let rows = vec![vec![1.0, f64::NAN, -1.0], vec![-1.0, 0.0, 1.0], vec![0.5, 0.0, -0.5]];
        let fit = fit_pca(&as_slices(&rows)).unwrap();
        assert!(fit.coefficients.iter().flatten().all(|v| v.is_finite()));
    }
}
