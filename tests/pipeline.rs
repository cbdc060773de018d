use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use nova_pca::app::pipeline::run_pipeline;
use nova_pca::dataset::SpectraSet;
use nova_pca::domain::{LoadSelection, PlotConfig, RunConfig, SneFamily};
use nova_pca::io::export::write_coefficients_csv;
use nova_pca::report::{format_pca_summary, format_set_summary};

fn temp_dir(name: &str) -> PathBuf {
    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();
    let dir = std::env::temp_dir().join(format!("nova_pca_{name}_{}_{epoch}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// One SNID-style template: three phases (-5, 14, 30), 101 wavelengths from 2501.69 in 50 A steps.
fn write_template(dir: &Path, name: &str, main: u8, sub: u8, seed: usize, marker: &str) {
    let phases = [-5.0, 14.0, 30.0];
    let mut text = format!("   {} 101   2501.69  10000.00   1   {name}   x   {main}   {sub}\n", phases.len());
    text.push_str("      7    1.0000    2.0000    3.0000\n");
    text.push_str("   0");
    for p in phases {
        text.push_str(&format!("   {p:.2}"));
    }
    text.push('\n');
    for k in 0..101 {
        let w = if k == 0 {
            marker.to_string()
        } else {
            format!("{:.2}", 2501.69 + 50.0 * k as f64)
        };
        text.push_str(&format!("   {w}"));
        for c in 0..phases.len() {
            let x = k as f64;
            let flux = 2.0 + (0.05 * x * (seed + 1) as f64 + c as f64).sin() + 0.01 * seed as f64 * x / 10.0;
            text.push_str(&format!("   {flux:.4}"));
        }
        text.push('\n');
    }
    fs::write(dir.join(format!("{name}.lnw")), text).expect("write template");
}

fn fixture_catalog() -> PathBuf {
    let dir = temp_dir("catalog");
    write_template(&dir, "sn1993J", 2, 4, 0, "2501.69");
    write_template(&dir, "sn1999ex", 2, 2, 1, "2501.69");
    write_template(&dir, "sn1994I", 3, 2, 2, "2501.69");
    write_template(&dir, "sn1998bw", 3, 4, 3, "2501.69");
    write_template(&dir, "sn2004aw", 3, 1, 4, "2501.69");
    write_template(&dir, "sn2007gr", 3, 3, 5, "2501.69");
    // Not selected by the default types.
    write_template(&dir, "sn2011fe", 1, 2, 6, "2501.69");
    // No data-row marker: skipped.
    write_template(&dir, "sn2002ap", 3, 4, 7, "2500.00");
    dir
}

fn config(catalog: PathBuf) -> RunConfig {
    RunConfig {
        catalog_dir: catalog,
        selection: LoadSelection::default(),
        smooth_icbl: Some(3000.0),
        rebin: 2,
        names: Vec::new(),
        plots: PlotConfig {
            eigen_show: 3,
            corner_components: 3,
            tsne_components: 2,
            reconstructions: 1,
            reconstruction_components: vec![0, 1, 3],
            spectra_alpha: 0.3,
            seed: 1,
        },
        out_dir: None,
        save: None,
        export_coefficients: None,
        export_eigenspectra: None,
        ascii: false,
    }
}

#[test]
fn full_pipeline_from_catalog_to_figures() {
    let catalog = fixture_catalog();
    let run = run_pipeline(&config(catalog.clone())).expect("pipeline");

    assert_eq!(run.set.len(), 6, "names={:?}", run.set.names());
    assert_eq!(run.skipped.len(), 1);
    assert_eq!(run.skipped[0].name, "sn2002ap");
    assert_eq!(run.files_read, 8);

    let smoothing = run.smoothing.as_ref().expect("smoothing result");
    assert_eq!(smoothing.names, vec!["sn1998bw".to_string()]);

    // 4001.69 .. 6951.69 in 50 A steps is 60 samples; rebinned by 2.
    assert_eq!(run.set.wavelengths.len(), 30);
    for record in &run.set.records {
        assert_eq!(record.phase, 14.0);
        assert_eq!(record.phase_column, 1);
        assert!(record.norm.is_some());
        assert_eq!(record.flux.len(), 30);
    }

    let basis = run.set.pca().expect("pca");
    let total: f64 = basis.explained_variance_ratio.iter().sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(basis
        .explained_variance_ratio
        .windows(2)
        .all(|w| w[0] >= w[1] - 1e-12));

    let names: Vec<&str> = run.figures.iter().map(|f| f.name.as_str()).collect();
    assert!(names.contains(&"smoothing"));
    assert!(names.contains(&"spectra"));
    assert!(names.contains(&"eigenspectra"));
    assert!(names.contains(&"corner"));
    assert!(names.contains(&"tsne"));
    assert_eq!(names.iter().filter(|n| n.starts_with("reconstruction_")).count(), 1);

    let summary = format_set_summary(&run.set);
    assert!(summary.contains("Spectra: n=6"));
    assert!(format_pca_summary(&run.set, 3).starts_with("PCA: "));

    fs::remove_dir_all(&catalog).unwrap();
}

#[test]
fn snapshot_and_exports_after_a_run() {
    let catalog = fixture_catalog();
    let out = temp_dir("out");
    let mut cfg = config(catalog.clone());
    cfg.names = vec!["sn1993J".into(), "sn1994I".into(), "sn1998bw".into(), "sn2007gr".into()];
    cfg.plots.tsne_components = 0;
    let run = run_pipeline(&cfg).expect("pipeline");
    assert_eq!(run.set.names(), vec!["sn1993J", "sn1994I", "sn1998bw", "sn2007gr"]);

    let snapshot = out.join("set.json");
    run.set.save(&snapshot).expect("save");
    let back = SpectraSet::load_snapshot(&snapshot).expect("reload");
    assert_eq!(back, run.set);

    let csv_path = out.join("coeffs.csv");
    write_coefficients_csv(&csv_path, &back).expect("export");
    let csv = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 1 + 4);
    assert!(csv.contains("sn1998bw,3,4,Ic-broad,14,"));

    for figure in &run.figures {
        figure.save(&out.join("figures")).expect("save figure");
    }
    assert!(out.join("figures").join("corner.svg").is_file());

    let mask = back.family_mask(SneFamily::IcBL);
    assert_eq!(mask, vec![false, false, true, false]);

    fs::remove_dir_all(&catalog).unwrap();
    fs::remove_dir_all(&out).unwrap();
}

#[test]
fn missing_catalog_is_an_input_error() {
    let err = run_pipeline(&config(PathBuf::from("/definitely/not/a/catalog"))).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn empty_catalog_with_rebinning_fails_at_pca() {
    let catalog = temp_dir("empty");
    let err = run_pipeline(&config(catalog.clone())).unwrap_err();
    assert_eq!(err.exit_code(), 3, "{err}");
    fs::remove_dir_all(&catalog).unwrap();
}
