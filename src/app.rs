//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - loads `.env` defaults and parses CLI arguments
//! - runs the analysis pipeline (or reloads a snapshot)
//! - prints reports and terminal previews
//! - writes figures, snapshots and exports

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::{Cli, Command, FigureArgs, InfoArgs, PlotArgs, RunArgs};
use crate::dataset::SpectraSet;
use crate::domain::{LoadSelection, PlotConfig, RunConfig};
use crate::error::AppError;
use crate::plot::Figure;

pub mod pipeline;

/// Default catalog directory when `--catalog` is absent.
pub const ENV_CATALOG_DIR: &str = "NOVA_CATALOG_DIR";
/// Default figure directory when `--out` is absent.
pub const ENV_OUT_DIR: &str = "NOVA_OUT_DIR";

const ASCII_WIDTH: usize = 100;
const ASCII_HEIGHT: usize = 20;

/// Entry point for the `nova` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Plot(args) => handle_plot(args),
        Command::Info(args) => handle_info(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let run = pipeline::run_pipeline(&config)?;

    print!("{}", crate::report::format_set_summary(&run.set));
    print!(
        "{}",
        crate::report::format_ingest_summary(run.files_read, run.set.len(), &run.skipped)
    );
    println!();
    println!("{}", crate::report::format_pca_summary(&run.set, 10));

    if config.ascii {
        print_previews(&run.set)?;
    }

    save_figures(&run.figures, config.out_dir.as_deref())?;
    if let Some(path) = &config.save {
        run.set.save(path)?;
    }
    if let Some(path) = &config.export_coefficients {
        crate::io::export::write_coefficients_csv(path, &run.set)?;
    }
    if let Some(path) = &config.export_eigenspectra {
        crate::io::export::write_eigenspectra_csv(path, &run.set)?;
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let set = SpectraSet::load_snapshot(&args.snapshot)?;
    let out_dir = args
        .out
        .clone()
        .or_else(|| env_path(ENV_OUT_DIR))
        .ok_or_else(|| AppError::input(format!("No output directory: pass --out or set {ENV_OUT_DIR}.")))?;

    let figures = pipeline::render_figures(&set, &plot_config_from_args(&args.figures))?;
    if args.ascii {
        print_previews(&set)?;
    }
    save_figures(&figures, Some(out_dir.as_path()))
}

fn handle_info(args: InfoArgs) -> Result<(), AppError> {
    let snapshot = crate::io::snapshot::read_snapshot(&args.snapshot)?;
    println!(
        "Snapshot: {} (saved {})",
        args.snapshot.display(),
        snapshot.saved_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    print!("{}", crate::report::format_set_summary(&snapshot.set));
    println!();
    print!("{}", crate::report::format_pca_summary(&snapshot.set, args.components));
    Ok(())
}

/// Build the pipeline configuration from `nova run` flags and the environment.
pub fn run_config_from_args(args: &RunArgs) -> Result<RunConfig, AppError> {
    let catalog_dir = args
        .catalog
        .clone()
        .or_else(|| env_path(ENV_CATALOG_DIR))
        .ok_or_else(|| AppError::input(format!("No catalog directory: pass --catalog or set {ENV_CATALOG_DIR}.")))?;

    if !(args.width.is_finite() && args.width >= 0.0) {
        return Err(AppError::input("Phase width must be finite and >= 0."));
    }
    if !(args.min_wavelength < args.max_wavelength) {
        return Err(AppError::input(format!(
            "Invalid wavelength range: ({}, {}).",
            args.min_wavelength, args.max_wavelength
        )));
    }

    let types = if args.all_types {
        Vec::new()
    } else if args.types.is_empty() {
        LoadSelection::default().types
    } else {
        args.types.clone()
    };

    Ok(RunConfig {
        catalog_dir,
        selection: LoadSelection {
            types,
            phase_kind: args.phase_kind,
            phase: args.phase,
            phase_width: args.width,
            min_wavelength: args.min_wavelength,
            max_wavelength: args.max_wavelength,
            marker: args.marker.clone(),
        },
        smooth_icbl: args.smooth_icbl,
        rebin: args.rebin,
        names: args.names.clone(),
        plots: plot_config_from_args(&args.figures),
        out_dir: args.out.clone().or_else(|| env_path(ENV_OUT_DIR)),
        save: args.save.clone(),
        export_coefficients: args.export_coeffs.clone(),
        export_eigenspectra: args.export_eigen.clone(),
        ascii: args.ascii,
    })
}

pub fn plot_config_from_args(args: &FigureArgs) -> PlotConfig {
    PlotConfig {
        eigen_show: args.eigen_show,
        corner_components: args.corner,
        tsne_components: args.tsne,
        reconstructions: args.recon,
        reconstruction_components: args.recon_components.clone(),
        spectra_alpha: args.alpha,
        seed: args.seed,
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn save_figures(figures: &[Figure], out_dir: Option<&Path>) -> Result<(), AppError> {
    let Some(dir) = out_dir else {
        log::info!("no output directory; {} figures not written", figures.len());
        return Ok(());
    };
    for figure in figures {
        figure.save(dir)?;
    }
    Ok(())
}

fn print_previews(set: &SpectraSet) -> Result<(), AppError> {
    println!("Sample mean:");
    println!(
        "{}",
        crate::plot::ascii::render_spectrum(&set.wavelengths, &set.sample_mean(), None, ASCII_WIDTH, ASCII_HEIGHT)
    );
    let basis = set.pca()?;
    if let Some(first) = basis.components.first() {
        println!("Eigenspectrum 0:");
        println!(
            "{}",
            crate::plot::ascii::render_spectrum(&set.wavelengths, first, None, ASCII_WIDTH, ASCII_HEIGHT)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["nova", "run", "--catalog", "templates"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn default_types_are_the_stripped_envelope_families() {
        let config = run_config_from_args(&run_args(&[])).unwrap();
        assert_eq!(config.catalog_dir, PathBuf::from("templates"));
        assert_eq!(config.selection, LoadSelection::default());
        assert_eq!(config.plots, PlotConfig::default());
        assert_eq!(config.rebin, 1);
    }

    #[test]
    fn all_types_clears_the_type_filter() {
        let config = run_config_from_args(&run_args(&["--all-types"])).unwrap();
        assert!(config.selection.types.is_empty());
    }

    #[test]
    fn explicit_flags_flow_into_the_config() {
        let config = run_config_from_args(&run_args(&[
            "--type", "3,4", "--smooth-icbl", "3000", "--rebin", "4", "--seed", "9", "--save", "set.json",
        ]))
        .unwrap();
        assert_eq!(config.selection.types.len(), 1);
        assert_eq!(config.smooth_icbl, Some(3000.0));
        assert_eq!(config.rebin, 4);
        assert_eq!(config.plots.seed, 9);
        assert_eq!(config.save, Some(PathBuf::from("set.json")));
    }

    #[test]
    fn inverted_wavelength_range_is_an_input_error() {
        let args = run_args(&["--min-wavelength", "7000", "--max-wavelength", "4000"]);
        assert_eq!(run_config_from_args(&args).unwrap_err().exit_code(), 2);
    }
}
