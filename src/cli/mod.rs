//! Command-line parsing for `nova`.
//!
//! Argument parsing and command dispatch stay separate from the analysis code;
//! `app` turns these structs into a `RunConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_WAVELENGTH_MARKER, PhaseKind, SneType};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "nova", version, about = "PCA and t-SNE of stripped-envelope supernova spectra (SNID templates)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a catalog, normalize, run PCA, print a summary and write figures/exports.
    Run(RunArgs),
    /// Re-render figures from a saved snapshot.
    Plot(PlotArgs),
    /// Print the summary of a saved snapshot.
    Info(InfoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// SNID template directory (defaults to $NOVA_CATALOG_DIR).
    #[arg(short = 'c', long, value_name = "DIR")]
    pub catalog: Option<PathBuf>,

    /// Type code MAIN,SUB to load; repeatable. Defaults to IIb, Ib, Ic and IcBL.
    #[arg(short = 't', long = "type", value_name = "MAIN,SUB")]
    pub types: Vec<SneType>,

    /// Load every type in the catalog (overrides --type).
    #[arg(long, conflicts_with = "types")]
    pub all_types: bool,

    /// Phase reference: max-light (0) or first-observation (1).
    #[arg(long, value_enum, default_value_t = PhaseKind::MaxLight)]
    pub phase_kind: PhaseKind,

    /// Requested phase (days).
    #[arg(short = 'p', long, default_value_t = 15.0, allow_negative_numbers = true)]
    pub phase: f64,

    /// Half-width of the accepted phase window (days).
    #[arg(short = 'w', long, default_value_t = 5.0)]
    pub width: f64,

    /// Exclusive lower wavelength cutoff (Angstrom).
    #[arg(long, default_value_t = 4000.0)]
    pub min_wavelength: f64,

    /// Exclusive upper wavelength cutoff (Angstrom).
    #[arg(long, default_value_t = 7000.0)]
    pub max_wavelength: f64,

    /// First-column token that marks the first data row of a template.
    #[arg(long, default_value = DEFAULT_WAVELENGTH_MARKER)]
    pub marker: String,

    /// Smooth IcBL spectra with a Gaussian of this velocity width (km/s).
    #[arg(long, value_name = "KM_S")]
    pub smooth_icbl: Option<f64>,

    /// Average every K adjacent wavelength samples after normalization.
    #[arg(long, default_value_t = 1, value_name = "K")]
    pub rebin: usize,

    /// Keep only these objects (comma-separated names).
    #[arg(long, value_delimiter = ',')]
    pub names: Vec<String>,

    /// Write figures here (defaults to $NOVA_OUT_DIR).
    #[arg(short = 'o', long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Save the analysed set as a JSON snapshot.
    #[arg(long, value_name = "JSON")]
    pub save: Option<PathBuf>,

    /// Export per-object PCA coefficients to CSV.
    #[arg(long = "export-coeffs", value_name = "CSV")]
    pub export_coeffs: Option<PathBuf>,

    /// Export eigenspectra to CSV.
    #[arg(long = "export-eigen", value_name = "CSV")]
    pub export_eigen: Option<PathBuf>,

    #[command(flatten)]
    pub figures: FigureArgs,

    /// Print terminal previews of the mean spectrum and first eigenspectrum.
    #[arg(long)]
    pub ascii: bool,
}

/// Figure selection shared by `run` and `plot`.
#[derive(Debug, Args, Clone)]
pub struct FigureArgs {
    /// Eigenspectra to draw (0 disables the figure).
    #[arg(long, default_value_t = 5)]
    pub eigen_show: usize,

    /// Components in the corner plot (below 2 disables it).
    #[arg(long, default_value_t = 5)]
    pub corner: usize,

    /// Leading PCA coefficients fed to t-SNE (0 disables it).
    #[arg(long, default_value_t = 5)]
    pub tsne: usize,

    /// Number of random reconstructions (0 disables them).
    #[arg(long, default_value_t = 1)]
    pub recon: usize,

    /// Component counts shown per reconstruction.
    #[arg(long, value_delimiter = ',', default_value = "0,1,5,10")]
    pub recon_components: Vec<usize>,

    /// Alpha of the non-highlighted spectra in the stacked plot.
    #[arg(long, default_value_t = 0.3)]
    pub alpha: f64,

    /// Seed for t-SNE initialisation and reconstruction sampling.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Snapshot written by `nova run --save`.
    #[arg(long, value_name = "JSON")]
    pub snapshot: PathBuf,

    /// Write figures here (defaults to $NOVA_OUT_DIR).
    #[arg(short = 'o', long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub figures: FigureArgs,

    /// Print terminal previews of the mean spectrum and first eigenspectrum.
    #[arg(long)]
    pub ascii: bool,
}

#[derive(Debug, Args, Clone)]
pub struct InfoArgs {
    /// Snapshot written by `nova run --save`.
    #[arg(long, value_name = "JSON")]
    pub snapshot: PathBuf,

    /// Rows of the explained-variance table.
    #[arg(long, default_value_t = 10)]
    pub components: usize,
}
