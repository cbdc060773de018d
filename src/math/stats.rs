//! Missing-value-aware statistics.
//!
//! Missing samples are marked with NaN. Every helper here ignores them, the way
//! `nanmean` / `nanstd` do, and returns NaN when no sample is present.

/// Mean over the non-NaN samples.
pub fn nan_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += v;
            n += 1;
        }
    }
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Population standard deviation (ddof = 0) over the non-NaN samples.
pub fn nan_std(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let mut ss = 0.0;
    let mut n = 0usize;
    for &v in values {
        if !v.is_nan() {
            let d = v - mean;
            ss += d * d;
            n += 1;
        }
    }
    (ss / n as f64).sqrt()
}

/// Column-wise NaN-aware mean of a row-major matrix.
///
/// Rows shorter than the first row are treated as missing in the absent columns.
pub fn nan_column_mean(rows: &[&[f64]]) -> Vec<f64> {
    let ncols = rows.first().map_or(0, |r| r.len());
    let mut column = Vec::with_capacity(rows.len());
    (0..ncols)
        .map(|j| {
            column.clear();
            column.extend(rows.iter().map(|r| r.get(j).copied().unwrap_or(f64::NAN)));
            nan_mean(&column)
        })
        .collect()
}
