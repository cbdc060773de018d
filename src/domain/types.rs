//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during the pipeline
//! - saved to a snapshot and reloaded later to resume analysis
//! - exported to CSV

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::nan_serde;

/// First observed wavelength in every SNID template; marks the first data row.
pub const DEFAULT_WAVELENGTH_MARKER: &str = "2501.69";

/// SNID type classification: `(main type, subtype)`.
///
/// The numbering follows the SNID template library, e.g. `(3, 4)` is `Ic-broad`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SneType {
    pub main: u8,
    pub sub: u8,
}

impl SneType {
    pub const fn new(main: u8, sub: u8) -> Self {
        Self { main, sub }
    }

    /// SNID type name, or `None` for codes outside the template table.
    pub fn name(self) -> Option<&'static str> {
        let names: &[&str] = match self.main {
            1 => &["Ia", "Ia-norm", "Ia-91T", "Ia-91bg", "Ia-csm", "Ia-pec", "Ia-99aa", "Ia-02cx"],
            2 => &["Ib", "Ib-norm", "Ib-pec", "IIb", "Ib-n"],
            3 => &["Ic", "Ic-norm", "Ic-pec", "Ic-broad"],
            4 => &["II", "IIP", "II-pec", "IIn", "IIL"],
            5 => &["NotSN", "AGN", "Gal", "LBV", "M-star", "QSO", "C-star"],
            _ => return None,
        };
        let idx = usize::from(self.sub).checked_sub(1)?;
        names.get(idx).copied()
    }

    /// Plot family this type belongs to (if any).
    pub fn family(self) -> Option<SneFamily> {
        match (self.main, self.sub) {
            (2, 4) => Some(SneFamily::IIb),
            (2, 1 | 2 | 3 | 5) => Some(SneFamily::Ib),
            (3, 1..=3) => Some(SneFamily::Ic),
            (3, 4) => Some(SneFamily::IcBL),
            _ => None,
        }
    }
}

impl fmt::Display for SneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "({},{})", self.main, self.sub),
        }
    }
}

impl FromStr for SneType {
    type Err = String;

    /// Parse `"3,4"` (or `"3:4"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (main, sub) = s
            .split_once([',', ':'])
            .ok_or_else(|| format!("Invalid type code '{s}'. Expected MAIN,SUB (e.g. 3,4)."))?;
        let main = main
            .trim()
            .parse::<u8>()
            .map_err(|e| format!("Invalid main type in '{s}': {e}"))?;
        let sub = sub
            .trim()
            .parse::<u8>()
            .map_err(|e| format!("Invalid subtype in '{s}': {e}"))?;
        Ok(Self { main, sub })
    }
}

/// Stripped-envelope families used for colouring plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum SneFamily {
    #[serde(rename = "IIb")]
    #[value(name = "iib")]
    IIb,
    #[serde(rename = "Ib")]
    #[value(name = "ib")]
    Ib,
    #[serde(rename = "Ic")]
    #[value(name = "ic")]
    Ic,
    #[serde(rename = "IcBL")]
    #[value(name = "icbl")]
    IcBL,
}

impl SneFamily {
    pub const ALL: [SneFamily; 4] = [SneFamily::IIb, SneFamily::Ib, SneFamily::Ic, SneFamily::IcBL];

    pub fn label(self) -> &'static str {
        match self {
            SneFamily::IIb => "IIb",
            SneFamily::Ib => "Ib",
            SneFamily::Ic => "Ic",
            SneFamily::IcBL => "IcBL",
        }
    }

    /// Every SNID code that maps to this family.
    pub fn types(self) -> &'static [SneType] {
        const IIB: &[SneType] = &[SneType::new(2, 4)];
        const IB: &[SneType] = &[
            SneType::new(2, 1),
            SneType::new(2, 2),
            SneType::new(2, 3),
            SneType::new(2, 5),
        ];
        const IC: &[SneType] = &[SneType::new(3, 1), SneType::new(3, 2), SneType::new(3, 3)];
        const ICBL: &[SneType] = &[SneType::new(3, 4)];

        match self {
            SneFamily::IIb => IIB,
            SneFamily::Ib => IB,
            SneFamily::Ic => IC,
            SneFamily::IcBL => ICBL,
        }
    }
}

/// Reference epoch of the phases in a template's phase header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseKind {
    /// Phase measured relative to maximum light (SNID code 0).
    #[value(alias = "0")]
    MaxLight,
    /// Phase measured relative to the first observation (SNID code 1).
    #[value(alias = "1")]
    FirstObservation,
}

impl PhaseKind {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PhaseKind::MaxLight),
            1 => Some(PhaseKind::FirstObservation),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            PhaseKind::MaxLight => 0,
            PhaseKind::FirstObservation => 1,
        }
    }
}

/// What to load from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSelection {
    /// Type codes to keep. Empty keeps every type.
    pub types: Vec<SneType>,
    pub phase_kind: PhaseKind,
    /// Requested phase (days); the nearest tabulated phase is used per object.
    pub phase: f64,
    /// Half-width of the accepted phase window (days).
    pub phase_width: f64,
    /// Exclusive lower wavelength cutoff (Å).
    pub min_wavelength: f64,
    /// Exclusive upper wavelength cutoff (Å).
    pub max_wavelength: f64,
    /// Text of the first wavelength value, used to locate the data block.
    pub marker: String,
}

impl LoadSelection {
    pub fn accepts_type(&self, t: SneType) -> bool {
        self.types.is_empty() || self.types.contains(&t)
    }

    /// Strict phase window check: `phase - width < p < phase + width`.
    pub fn accepts_phase(&self, p: f64) -> bool {
        p > self.phase - self.phase_width && p < self.phase + self.phase_width
    }

    pub fn accepts_wavelength(&self, w: f64) -> bool {
        w > self.min_wavelength && w < self.max_wavelength
    }

    /// Short label such as `15±5`, used in figure titles.
    pub fn window_label(&self) -> String {
        format!("{}±{}", fmt_compact(self.phase), fmt_compact(self.phase_width))
    }
}

impl Default for LoadSelection {
    fn default() -> Self {
        let types = SneFamily::ALL
            .iter()
            .flat_map(|f| f.types().iter().copied())
            .collect();
        Self {
            types,
            phase_kind: PhaseKind::MaxLight,
            phase: 15.0,
            phase_width: 5.0,
            min_wavelength: 4000.0,
            max_wavelength: 7000.0,
            marker: DEFAULT_WAVELENGTH_MARKER.to_string(),
        }
    }
}

fn fmt_compact(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e9 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Per-row normalization parameters recorded by preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowNorm {
    pub mean: f64,
    pub std: f64,
}

/// Everything known about one object.
///
/// Keeping every per-object attribute on one record is what keeps the
/// collection index-aligned: a mask is a single `retain` over records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumRecord {
    pub name: String,
    pub sne_type: SneType,
    /// Tabulated phase nearest the requested one.
    pub phase: f64,
    /// Line index of the first data row in the catalog file.
    pub data_row: usize,
    /// Index of the selected phase among the flux columns (0-based, excluding wavelength).
    pub phase_column: usize,
    /// Flux on the shared wavelength grid. NaN marks missing samples.
    #[serde(with = "nan_serde::vec")]
    pub flux: Vec<f64>,
    #[serde(default)]
    pub norm: Option<RowNorm>,
    /// Projection onto the PCA basis (set by `calculate_pca`).
    #[serde(default, with = "nan_serde::opt_vec")]
    pub coefficients: Option<Vec<f64>>,
}

/// Principal-component basis of the normalized matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaBasis {
    /// Eigenspectra, ranked by explained variance. Each has the grid's length.
    pub components: Vec<Vec<f64>>,
    /// Explained-variance fraction per component.
    pub explained_variance_ratio: Vec<f64>,
    /// Running sum of `explained_variance_ratio`.
    pub cumulative_variance: Vec<f64>,
    /// Column means removed before the decomposition.
    #[serde(with = "nan_serde::vec")]
    pub mean: Vec<f64>,
}

impl PcaBasis {
    pub fn n_components(&self) -> usize {
        self.components.len()
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus `.env` defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub catalog_dir: PathBuf,
    pub selection: LoadSelection,

    /// Smooth IcBL spectra with this Gaussian velocity width (km/s) before preprocessing.
    pub smooth_icbl: Option<f64>,
    /// Wavelength rebin factor applied after preprocessing (1 = off).
    pub rebin: usize,
    /// Keep only these object names (empty keeps all).
    pub names: Vec<String>,

    pub plots: PlotConfig,

    pub out_dir: Option<PathBuf>,
    pub save: Option<PathBuf>,
    pub export_coefficients: Option<PathBuf>,
    pub export_eigenspectra: Option<PathBuf>,
    /// Print terminal previews of the mean spectrum and first eigenspectrum.
    pub ascii: bool,
}

/// Which figures to draw and how.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    /// Eigenspectra panels to draw (0 disables the figure).
    pub eigen_show: usize,
    /// Components in the corner plot (0 or 1 disables it).
    pub corner_components: usize,
    /// Leading coefficients fed to t-SNE (0 disables it).
    pub tsne_components: usize,
    /// Number of random reconstructions (0 disables them).
    pub reconstructions: usize,
    /// Component counts shown per reconstruction figure.
    pub reconstruction_components: Vec<usize>,
    /// Alpha of the non-highlighted spectra in the stacked plot.
    pub spectra_alpha: f64,
    /// Seed shared by t-SNE initialisation and reconstruction sampling.
    pub seed: u64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            eigen_show: 5,
            corner_components: 5,
            tsne_components: 5,
            reconstructions: 1,
            reconstruction_components: vec![0, 1, 5, 10],
            spectra_alpha: 0.3,
            seed: 0,
        }
    }
}
