//! Crate-wide error type.

use thiserror::Error;

use crate::config::ConfigError;

/// Fatal conditions raised by the sizing core and its I/O glue.
///
/// Every variant carries the offending value so callers can report it
/// without re-deriving context. Numeric outcomes such as a diverging IRR or
/// a missing break-even are values (`NaN`, `999`), never errors.
#[derive(Debug, Error)]
pub enum SizingError {
    #[error("unsupported resolution: {periods} samples do not match any supported yearly series")]
    UnsupportedResolution { periods: usize },

    #[error("resolution {tag} expects {expected} samples, got {actual}")]
    ResolutionMismatch {
        tag: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("series length mismatch: generation has {generation} samples, consumption has {consumption}")]
    LengthMismatch {
        generation: usize,
        consumption: usize,
    },

    #[error("invalid sample in {series} at index {index}: {value}")]
    InvalidSample {
        series: &'static str,
        index: usize,
        value: f64,
    },

    #[error("{name} price series has {actual} samples, expected {expected}")]
    PriceLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("battery capacity {capacity} kWh is outside the cost curve range 1..=200 kWh")]
    CapacityOutOfRange { capacity: i64 },

    #[error("no cost curve entry for {capacity} kWh")]
    MissingCostEntry { capacity: u32 },

    #[error("reference scenario unavailable: supply reference import/export totals or both series")]
    MissingReference,

    #[error("min SOC {min_pct}% must be below max SOC {max_pct}%")]
    InvalidSocWindow { min_pct: f64, max_pct: f64 },

    #[error("invalid parameter {field}: {value} ({constraint})")]
    InvalidParameter {
        field: &'static str,
        value: f64,
        constraint: &'static str,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = SizingError> = std::result::Result<T, E>;
