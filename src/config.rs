//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::catalog::CostCurve;
use crate::error::SizingError;
use crate::finance::FinanceParams;
use crate::optimizer::SweepRange;
use crate::profile::SyntheticProfile;
use crate::sim::balance::DEFAULT_TOLERANCE_PCT;
use crate::sim::types::{BatteryConfig, PriceSignal, Tariff};

/// Top-level sizing scenario parsed from TOML.
///
/// All sections have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Battery parameters shared by every swept capacity.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Grid and feed-in prices, flat or one value per interval.
    #[serde(default)]
    pub tariff: Tariff,
    /// Lifetime, discount rate and DB III interest rate.
    #[serde(default)]
    pub finance: FinanceParams,
    /// Capacity range and ranking criterion.
    #[serde(default)]
    pub sweep: SweepRange,
    /// Energy balance tolerance.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Linear demo cost curve used when no cost CSV is supplied.
    #[serde(default)]
    pub cost: DemoCostConfig,
    /// Synthetic demo year used when no profile CSV is supplied.
    #[serde(default)]
    pub profile: SyntheticProfile,
}

/// Energy balance validation parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Relative deviation tolerated per balance check (%).
    pub tolerance_pct: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
        }
    }
}

/// Fixed plus per-kWh installed cost.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoCostConfig {
    /// Installation cost independent of size (EUR).
    pub fixed_eur: f64,
    /// Cost per kWh of capacity (EUR).
    pub per_kwh_eur: f64,
}

impl Default for DemoCostConfig {
    fn default() -> Self {
        Self {
            fixed_eur: 1500.0,
            per_kwh_eur: 550.0,
        }
    }
}

impl DemoCostConfig {
    pub fn curve(&self) -> CostCurve {
        CostCurve::linear(self.fixed_eur, self.per_kwh_eur)
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.min_soc_pct"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Rewrites a section validation failure as a dotted field path.
    fn from_section(section: &str, err: SizingError) -> Self {
        match err {
            SizingError::InvalidParameter {
                field, constraint, ..
            } => Self::new(format!("{section}.{field}"), constraint),
            SizingError::InvalidSocWindow { .. } => Self::new(
                format!("{section}.min_soc_pct"),
                format!("must be < {section}.max_soc_pct"),
            ),
            other => Self::new(section, other.to_string()),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a 6 kWp home with the default battery.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the large-home preset: bigger array, higher load, wider sweep.
    pub fn large_home() -> Self {
        Self {
            battery: BatteryConfig {
                capacity_kwh: 15.0,
                max_charge_kw: 7.5,
                max_discharge_kw: 7.5,
                ..BatteryConfig::default()
            },
            sweep: SweepRange {
                max_kwh: 30.0,
                step_kwh: 2.0,
                ..SweepRange::default()
            },
            profile: SyntheticProfile {
                pv_kw_peak: 10.0,
                load_base_kw: 0.9,
                load_amp_kw: 0.4,
                ..SyntheticProfile::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "large_home"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "large_home" => Ok(Self::large_home()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all sections and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid. Per-interval price
    /// lengths are checked against the profile at simulation time.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.battery.validate() {
            errors.push(ConfigError::from_section("battery", e));
        }
        if let Err(e) = self.finance.validate() {
            errors.push(ConfigError::from_section("finance", e));
        }
        if let Err(e) = self.sweep.validate() {
            errors.push(ConfigError::from_section("sweep", e));
        }

        for (field, signal) in [
            ("tariff.grid", &self.tariff.grid),
            ("tariff.feed_in", &self.tariff.feed_in),
        ] {
            let bad = match signal {
                PriceSignal::Flat(p) => !p.is_finite(),
                PriceSignal::Series(s) => s.is_empty() || s.iter().any(|p| !p.is_finite()),
            };
            if bad {
                errors.push(ConfigError::new(
                    field,
                    "must be a finite price or a non-empty list of finite prices",
                ));
            }
        }

        let tol = self.validation.tolerance_pct;
        if !tol.is_finite() || tol <= 0.0 {
            errors.push(ConfigError::new("validation.tolerance_pct", "must be > 0"));
        }

        let cost = &self.cost;
        if !cost.fixed_eur.is_finite() || cost.fixed_eur < 0.0 {
            errors.push(ConfigError::new("cost.fixed_eur", "must be >= 0"));
        }
        if !cost.per_kwh_eur.is_finite() || cost.per_kwh_eur <= 0.0 {
            errors.push(ConfigError::new("cost.per_kwh_eur", "must be > 0"));
        }

        let p = &self.profile;
        if p.sunrise_hour >= p.sunset_hour {
            errors.push(ConfigError::new(
                "profile.sunrise_hour",
                "must be < profile.sunset_hour",
            ));
        }
        if p.sunrise_hour < 0.0 || p.sunset_hour > 24.0 {
            errors.push(ConfigError::new(
                "profile.sunset_hour",
                "daylight window must lie within [0, 24]",
            ));
        }
        if !(0.0..=1.0).contains(&p.seasonal_amplitude) {
            errors.push(ConfigError::new(
                "profile.seasonal_amplitude",
                "must be in [0.0, 1.0]",
            ));
        }
        if p.pv_kw_peak < 0.0 || p.load_base_kw < 0.0 {
            errors.push(ConfigError::new(
                "profile.pv_kw_peak",
                "peak and base power must be >= 0",
            ));
        }

        errors
    }
}
