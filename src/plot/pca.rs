//! PCA figures: eigenspectra, reconstructions and the coefficient corner plot.

use plotters::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::SpectraSet;
use crate::domain::SneFamily;
use crate::error::AppError;
use crate::plot::{DrawResult, Figure, family_rgb, padded_range, render, segments};

/// The leading `nshow` eigenspectra, one panel each, scaled by their
/// explained-variance fraction.
pub fn plot_eigenspectra(set: &SpectraSet, nshow: usize) -> Result<Figure, AppError> {
    let basis = set.pca()?;
    let nshow = clamp_components(nshow, basis.n_components(), "eigenspectra")?;
    let title = format!("PCA Eigenspectra Phase {}", set.selection.window_label());
    let x_range = padded_range(set.wavelengths.iter().copied(), 0.0);

    render("eigenspectra", &title, (1000, 200 * nshow as u32 + 80), |root| -> DrawResult {
        let body = root.titled(&title, ("sans-serif", 20))?;
        let panels = body.split_evenly((nshow, 1));
        for (i, panel) in panels.iter().enumerate() {
            let ratio = basis.explained_variance_ratio[i];
            let scaled: Vec<f64> = basis.components[i].iter().map(|v| ratio * v).collect();
            let y_range = padded_range(scaled.iter().copied(), 0.0);

            let mut chart = ChartBuilder::on(panel)
                .margin(5)
                .x_label_area_size(if i + 1 == nshow { 30 } else { 0 })
                .y_label_area_size(50)
                .build_cartesian_2d(x_range.clone(), y_range)?;
            let mut mesh = chart.configure_mesh();
            mesh.disable_mesh().y_desc("Rel Flux");
            if i + 1 == nshow {
                mesh.x_desc("Wavelength");
            }
            mesh.draw()?;

            let label = format!("component: {i}, {:.2}", basis.cumulative_variance[i]);
            for (k, seg) in segments(&set.wavelengths, &scaled).into_iter().enumerate() {
                let series = chart.draw_series(LineSeries::new(seg, BLUE))?;
                if k == 0 {
                    series
                        .label(label.clone())
                        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
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

/// Reconstructions of `nrecon` randomly chosen spectra (drawn with replacement
/// from a `seed`ed generator): one figure per spectrum, one panel per entry of
/// `components`. The true spectrum is grey, the reconstruction black.
pub fn plot_reconstructions(
    set: &SpectraSet,
    nrecon: usize,
    components: &[usize],
    seed: u64,
) -> Result<Vec<Figure>, AppError> {
    let basis = set.pca()?;
    if set.is_empty() {
        return Err(AppError::data("No spectra to reconstruct."));
    }
    if components.is_empty() {
        return Err(AppError::input("Reconstruction needs at least one component count."));
    }
    let x_range = padded_range(set.wavelengths.iter().copied(), 0.0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut figures = Vec::with_capacity(nrecon);

    for k in 0..nrecon {
        let index = rng.gen_range(0..set.len());
        let record = &set.records[index];
        let title = format!("{} PCA Reconstruction", record.name);
        let curves = components
            .iter()
            .map(|&n| {
                let n = n.min(basis.n_components());
                Ok((reconstruction_label(n, &basis.cumulative_variance), set.reconstruct(index, n)?))
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        let name = format!("reconstruction_{k}_{}", record.name);
        let figure = render(&name, &title, (1000, 250 * curves.len() as u32 + 80), |root| -> DrawResult {
            let body = root.titled(&title, ("sans-serif", 20))?;
            let panels = body.split_evenly((curves.len(), 1));
            for (i, (panel, (label, recon))) in panels.iter().zip(&curves).enumerate() {
                let last = i + 1 == curves.len();
                let mut chart = ChartBuilder::on(panel)
                    .caption(label, ("sans-serif", 14))
                    .margin(5)
                    .x_label_area_size(if last { 30 } else { 0 })
                    .y_label_area_size(40)
                    .build_cartesian_2d(x_range.clone(), -5.0..5.0)?;
                let mut mesh = chart.configure_mesh();
                mesh.disable_mesh().y_desc("flux");
                if last {
                    mesh.x_desc("wavelength (A)");
                }
                mesh.draw()?;

                for seg in segments(&set.wavelengths, &record.flux) {
                    chart.draw_series(LineSeries::new(seg, RGBColor(128, 128, 128)))?;
                }
                for seg in segments(&set.wavelengths, recon) {
                    chart.draw_series(LineSeries::new(seg, BLACK))?;
                }
            }
            Ok(())
        })?;
        figures.push(figure);
    }
    Ok(figures)
}

fn reconstruction_label(n: usize, cumulative: &[f64]) -> String {
    match n {
        0 => "mean".to_string(),
        1 => format!("1 component (σ²={:.2})", cumulative[0]),
        _ => format!("{n} components (σ²={:.2})", cumulative[n - 1]),
    }
}

/// Lower-triangle grid of coefficient pairs (row `i` vs column `j`, `i > j`).
///
/// Points are family-coloured; translucent markers show each family's centroid.
/// Objects outside the four families are left out.
pub fn plot_corner(set: &SpectraSet, ncomp: usize) -> Result<Figure, AppError> {
    let coeffs = set.coefficient_rows()?;
    let available = coeffs.first().map_or(0, |c| c.len());
    let ncomp = clamp_components(ncomp, available, "corner plot")?;
    if ncomp < 2 {
        return Err(AppError::data("Corner plot needs at least two PCA components."));
    }
    let ranges: Vec<_> = (0..ncomp)
        .map(|c| padded_range(coeffs.iter().map(|r| r[c]), 2.0))
        .collect();
    let title = format!(
        "PCA Component 2D Marginalizations (Phase {} Days)",
        set.selection.window_label()
    );
    let side = 200 * ncomp as u32 + 60;

    render("corner", &title, (side, side), |root| -> DrawResult {
        let body = root.titled(&title, ("sans-serif", 20))?;
        let panels = body.split_evenly((ncomp, ncomp));

        for i in 1..ncomp {
            for j in 0..i {
                let panel = &panels[ncomp * i + j];
                let mut chart = ChartBuilder::on(panel)
                    .margin(3)
                    .x_label_area_size(if i + 1 == ncomp { 30 } else { 0 })
                    .y_label_area_size(if j == 0 { 40 } else { 0 })
                    .build_cartesian_2d(ranges[j].clone(), ranges[i].clone())?;
                let mut mesh = chart.configure_mesh();
                mesh.disable_mesh().x_labels(3).y_labels(3);
                if j == 0 {
                    mesh.y_desc(format!("PCA Comp {i}"));
                }
                if i + 1 == ncomp {
                    mesh.x_desc(format!("PCA Comp {j}"));
                }
                mesh.draw()?;

                for family in SneFamily::ALL {
                    if let Some((cx, cy)) = family_centroid(set, &coeffs, family, j, i) {
                        chart.draw_series(std::iter::once(Circle::new(
                            (cx, cy),
                            8,
                            family_rgb(family).mix(0.5).filled(),
                        )))?;
                    }
                }
                chart.draw_series(set.records.iter().zip(&coeffs).filter_map(|(record, c)| {
                    let family = record.sne_type.family()?;
                    Some(Circle::new((c[j], c[i]), 3, family_rgb(family).filled()))
                }))?;
            }
        }

        draw_family_legend(&panels[ncomp - 1])?;
        Ok(())
    })
}

fn family_centroid(set: &SpectraSet, coeffs: &[&[f64]], family: SneFamily, x: usize, y: usize) -> Option<(f64, f64)> {
    let (sx, sy, n) = set
        .records
        .iter()
        .zip(coeffs)
        .filter(|(record, _)| record.sne_type.family() == Some(family))
        .fold((0.0, 0.0, 0usize), |(sx, sy, n), (_, c)| (sx + c[x], sy + c[y], n + 1));
    (n > 0).then(|| (sx / n as f64, sy / n as f64))
}

fn draw_family_legend(area: &DrawingArea<SVGBackend<'_>, plotters::coord::Shift>) -> DrawResult {
    let style = ("sans-serif", 14).into_font();
    for (k, family) in SneFamily::ALL.into_iter().enumerate() {
        let y = 20 + 22 * k as i32;
        area.draw(&Circle::new((20, y), 6, family_rgb(family).filled()))?;
        area.draw(&Text::new(family.label(), (34, y - 7), style.clone()))?;
    }
    Ok(())
}

fn clamp_components(requested: usize, available: usize, what: &str) -> Result<usize, AppError> {
    if requested == 0 {
        return Err(AppError::input(format!("{what}: need at least one component.")));
    }
    if available == 0 {
        return Err(AppError::data(format!("{what}: no PCA components available.")));
    }
    if requested > available {
        log::warn!("{what}: only {available} components available (requested {requested})");
    }
    Ok(requested.min(available))
}
