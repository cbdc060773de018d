//! Input-spectra figures.

use plotters::prelude::*;

use crate::dataset::{SmoothingResult, SpectraSet};
use crate::error::AppError;
use crate::math::{nan_mean, nan_std};
use crate::plot::{DrawResult, Figure, family_color, padded_range, render, segments};

/// Vertical offset between consecutive spectra in the stacked plot.
const STACK_OFFSET: f64 = 2.0;

/// Every spectrum, stacked with an offset of `2·i`.
///
/// Every tenth spectrum is drawn opaque, the rest with `alpha`.
pub fn plot_spectra(set: &SpectraSet, alpha: f64) -> Result<Figure, AppError> {
    if set.is_empty() {
        return Err(AppError::data("No spectra to plot."));
    }
    let alpha = alpha.clamp(0.0, 1.0);
    let x_range = padded_range(set.wavelengths.iter().copied(), 0.0);
    let y_range = padded_range(
        set.records
            .iter()
            .enumerate()
            .flat_map(|(i, r)| r.flux.iter().map(move |v| v + STACK_OFFSET * i as f64)),
        1.0,
    );
    let height = (400 + 12 * set.len() as u32).min(4000);

    render("spectra", "All Spectra", (1000, height), |root| -> DrawResult {
        let mut chart = ChartBuilder::on(root)
            .caption("All Spectra", ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, y_range)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Wavelength (Angstroms)")
            .y_desc("Flux + offset")
            .draw()?;

        for (i, record) in set.records.iter().enumerate() {
            let offset = STACK_OFFSET * i as f64;
            let shifted: Vec<f64> = record.flux.iter().map(|v| v + offset).collect();
            let a = if i % 10 == 0 { 1.0 } else { alpha };
            let style = family_color(record.sne_type).mix(a);
            for seg in segments(&set.wavelengths, &shifted) {
                chart.draw_series(LineSeries::new(seg, style))?;
            }
        }
        Ok(())
    })
}

/// Smoothed (black) against pre-smoothed (red) spectra, one panel per object.
///
/// Both curves are scaled to zero mean and unit std so the comparison is
/// independent of the flux scale.
pub fn plot_smoothing(wavelengths: &[f64], smoothing: &SmoothingResult, window: &str) -> Result<Figure, AppError> {
    if smoothing.is_empty() {
        return Err(AppError::data("No smoothed spectra to plot."));
    }
    let x_range = padded_range(wavelengths.iter().copied(), 0.0);
    let n = smoothing.names.len();
    let title = format!("Smoothed IcBL spectra (phase {window})");

    render("smoothing", &title, (1000, (220 * n as u32).clamp(300, 6000)), |root| -> DrawResult {
        let body = root.titled(&title, ("sans-serif", 20))?;
        let panels = body.split_evenly((n, 1));
        for (k, panel) in panels.iter().enumerate() {
            let before = standardized(&smoothing.before[k]);
            let after = standardized(&smoothing.after[k]);
            let y_range = padded_range(before.iter().chain(&after).copied(), 0.5);

            let mut chart = ChartBuilder::on(panel)
                .margin(5)
                .x_label_area_size(if k + 1 == n { 30 } else { 0 })
                .y_label_area_size(40)
                .build_cartesian_2d(x_range.clone(), y_range)?;
            chart.configure_mesh().disable_mesh().draw()?;

            let name = &smoothing.names[k];
            for (i, seg) in segments(wavelengths, &after).into_iter().enumerate() {
                let series = chart.draw_series(LineSeries::new(seg, BLACK))?;
                if i == 0 {
                    series
                        .label(format!("smoothed {name}"))
                        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));
                }
            }
            for (i, seg) in segments(wavelengths, &before).into_iter().enumerate() {
                let series = chart.draw_series(LineSeries::new(seg, RED))?;
                if i == 0 {
                    series
                        .label(format!("pre smoothed {name}"))
                        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
                }
            }
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    })
}

fn standardized(values: &[f64]) -> Vec<f64> {
    let mean = nan_mean(values);
    let std = nan_std(values);
    if !(std.is_finite() && std > 0.0) {
        return values.to_vec();
    }
    values.iter().map(|v| (v - mean) / std).collect()
}
