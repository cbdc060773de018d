//! CSV exports of the decomposition.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts:
//!
//! - coefficients: one row per object (`name,type_main,type_sub,type,phase,pc0,pc1,...`)
//! - eigenspectra: one row per wavelength (`wavelength,pc0,pc1,...`), plus the
//!   explained-variance fractions in a trailing comment-free `variance` row

use std::fs::File;
use std::path::Path;

use crate::dataset::SpectraSet;
use crate::error::AppError;

/// Write per-object PCA coefficients.
pub fn write_coefficients_csv(path: &Path, set: &SpectraSet) -> Result<(), AppError> {
    let rows = set.coefficient_rows()?;
    let n_comp = rows.first().map_or(0, |r| r.len());

    let mut writer = csv::Writer::from_writer(create(path)?);
    let mut header = vec![
        "name".to_string(),
        "type_main".to_string(),
        "type_sub".to_string(),
        "type".to_string(),
        "phase".to_string(),
    ];
    header.extend((0..n_comp).map(|k| format!("pc{k}")));
    writer.write_record(&header).map_err(write_err)?;

    for (record, coeffs) in set.records.iter().zip(rows) {
        let mut row = vec![
            record.name.clone(),
            record.sne_type.main.to_string(),
            record.sne_type.sub.to_string(),
            record.sne_type.to_string(),
            format!("{}", record.phase),
        ];
        row.extend(coeffs.iter().map(|c| format!("{c:.10}")));
        writer.write_record(&row).map_err(write_err)?;
    }
    writer.flush().map_err(|e| write_err(e.into()))?;

    log::info!("wrote coefficients for {} spectra to {}", set.len(), path.display());
    Ok(())
}

/// Write the eigenspectra on the wavelength grid.
pub fn write_eigenspectra_csv(path: &Path, set: &SpectraSet) -> Result<(), AppError> {
    let basis = set.pca()?;
    let mut writer = csv::Writer::from_writer(create(path)?);

    let mut header = vec!["wavelength".to_string()];
    header.extend((0..basis.n_components()).map(|k| format!("pc{k}")));
    writer.write_record(&header).map_err(write_err)?;

    for (j, w) in set.wavelengths.iter().enumerate() {
        let mut row = vec![format!("{w}")];
        row.extend(basis.components.iter().map(|c| format!("{:.10}", c[j])));
        writer.write_record(&row).map_err(write_err)?;
    }

    let mut variance = vec!["variance".to_string()];
    variance.extend(basis.explained_variance_ratio.iter().map(|r| format!("{r:.10}")));
    writer.write_record(&variance).map_err(write_err)?;
    writer.flush().map_err(|e| write_err(e.into()))?;

    log::info!("wrote {} eigenspectra to {}", basis.n_components(), path.display());
    Ok(())
}

fn create(path: &Path) -> Result<File, AppError> {
    File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create export CSV '{}': {e}", path.display())))
}

fn write_err(e: csv::Error) -> AppError {
    AppError::runtime(format!("Failed to write export CSV: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::small_set;
    use crate::io::ingest::tests::scratch_dir;

    #[test]
    fn exports_one_row_per_object_and_wavelength() {
        let dir = scratch_dir("export");
        let mut set = small_set();
        set.preprocess().unwrap();
        set.calculate_pca().unwrap();

        let coeffs = dir.join("coeffs.csv");
        write_coefficients_csv(&coeffs, &set).unwrap();
        let text = std::fs::read_to_string(&coeffs).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + set.len());
        assert!(lines[0].starts_with("name,type_main,type_sub,type,phase,pc0"));
        assert!(lines[1].starts_with("sn_a,2,4,IIb,15,"));

        let eigen = dir.join("eigen.csv");
        write_eigenspectra_csv(&eigen, &set).unwrap();
        let text = std::fs::read_to_string(&eigen).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + set.wavelengths.len() + 1);
        assert!(lines.last().unwrap().starts_with("variance,"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn coefficients_require_pca() {
        let set = small_set();
        let err = write_coefficients_csv(Path::new("/tmp/unused.csv"), &set).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
