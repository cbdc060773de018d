//! t-SNE scatter.

use plotters::prelude::*;

use crate::dataset::SpectraSet;
use crate::error::AppError;
use crate::math::TsneParams;
use crate::plot::{DrawResult, Figure, family_rgb, padded_range, render};

/// Embed the leading `ncomp` PCA coefficients and scatter them by family.
///
/// Every spectrum takes part in the embedding; only family members are drawn.
pub fn plot_tsne(set: &SpectraSet, ncomp: usize, params: &TsneParams) -> Result<Figure, AppError> {
    let points = set.embed(ncomp, params)?;
    let x_range = padded_range(points.iter().map(|p| p[0]), 1.0);
    let y_range = padded_range(points.iter().map(|p| p[1]), 1.0);

    render("tsne", "TSNE Projection from PCA", (800, 800), |root| -> DrawResult {
        let mut chart = ChartBuilder::on(root)
            .caption("TSNE Projection from PCA", ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, y_range)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("TSNE Component 0")
            .y_desc("TSNE Component 1")
            .draw()?;

        chart.draw_series(set.records.iter().zip(&points).filter_map(|(record, p)| {
            let family = record.sne_type.family()?;
            Some(Circle::new((p[0], p[1]), 4, family_rgb(family).filled()))
        }))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::small_set;
    use crate::domain::SneType;

    #[test]
    fn scatter_has_a_marker_per_spectrum() {
        let mut set = small_set();
        set.preprocess().unwrap();
        set.calculate_pca().unwrap();
        let params = TsneParams { n_iter: 300, ..TsneParams::default() };
        let fig = plot_tsne(&set, 3, &params).unwrap();
        assert!(fig.svg.contains("TSNE Component 0"));
        assert!(fig.svg.matches("<circle").count() >= set.len());
    }

    #[test]
    fn objects_outside_the_families_are_not_drawn() {
        let mut set = small_set();
        set.records[0].sne_type = SneType::new(1, 2);
        set.records[1].sne_type = SneType::new(1, 2);
        set.preprocess().unwrap();
        set.calculate_pca().unwrap();
        let params = TsneParams { n_iter: 300, ..TsneParams::default() };
        let fig = plot_tsne(&set, 3, &params).unwrap();
        assert_eq!(fig.svg.matches("<circle").count(), 3);
        assert!(!fig.svg.contains("#808080"));
    }

    #[test]
    fn embedding_needs_coefficients() {
        let set = small_set();
        assert_eq!(plot_tsne(&set, 3, &TsneParams::default()).unwrap_err().exit_code(), 3);
    }
}
