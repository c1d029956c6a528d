//! Core simulation types: input series, tariffs, battery parameters, and flow records.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::resolution::DetectedResolution;
use crate::error::{Result, SizingError};

/// Aligned yearly generation and consumption series in kWh per interval.
///
/// The resolution is carried explicitly and validated against the sample
/// count on construction.
///
/// # Examples
///
/// ```
/// use bess_sizer::sim::types::Profile;
///
/// let profile = Profile::new(vec![0.0; 8760], vec![1.0; 8760]).unwrap();
/// assert_eq!(profile.resolution().tag(), "hourly");
/// assert_eq!(profile.len(), 8760);
/// ```
#[derive(Debug, Clone)]
pub struct Profile {
    generation: Vec<f64>,
    consumption: Vec<f64>,
    resolution: DetectedResolution,
}

impl Profile {
    /// Builds a profile, detecting the resolution from the sample count.
    ///
    /// # Errors
    ///
    /// Fails on length mismatch, an unsupported count, or a negative or
    /// non-finite sample.
    pub fn new(generation: Vec<f64>, consumption: Vec<f64>) -> Result<Self> {
        check_lengths(&generation, &consumption)?;
        let resolution = DetectedResolution::detect(generation.len())?;
        Self::build(generation, consumption, resolution)
    }

    /// Builds a profile with an explicitly known resolution.
    ///
    /// # Errors
    ///
    /// Fails when the explicit resolution disagrees with the sample count,
    /// plus every condition of [`Profile::new`].
    pub fn with_resolution(
        generation: Vec<f64>,
        consumption: Vec<f64>,
        resolution: DetectedResolution,
    ) -> Result<Self> {
        check_lengths(&generation, &consumption)?;
        resolution.check(generation.len())?;
        Self::build(generation, consumption, resolution)
    }

    fn build(
        generation: Vec<f64>,
        consumption: Vec<f64>,
        resolution: DetectedResolution,
    ) -> Result<Self> {
        check_samples("generation", &generation)?;
        check_samples("consumption", &consumption)?;
        Ok(Self {
            generation,
            consumption,
            resolution,
        })
    }

    pub fn generation(&self) -> &[f64] {
        &self.generation
    }

    pub fn consumption(&self) -> &[f64] {
        &self.consumption
    }

    pub fn resolution(&self) -> DetectedResolution {
        self.resolution
    }

    pub fn interval_hours(&self) -> f64 {
        self.resolution.interval_hours()
    }

    pub fn len(&self) -> usize {
        self.generation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generation.is_empty()
    }
}

fn check_lengths(generation: &[f64], consumption: &[f64]) -> Result<()> {
    if generation.len() == consumption.len() {
        Ok(())
    } else {
        Err(SizingError::LengthMismatch {
            generation: generation.len(),
            consumption: consumption.len(),
        })
    }
}

fn check_samples(series: &'static str, values: &[f64]) -> Result<()> {
    match values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        Some((index, &value)) => Err(SizingError::InvalidSample {
            series,
            index,
            value,
        }),
        None => Ok(()),
    }
}

/// A price in currency per kWh, either constant or one value per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceSignal {
    Flat(f64),
    Series(Vec<f64>),
}

impl PriceSignal {
    /// Price applying to step `i`.
    ///
    /// Series are length-checked by [`Tariff::check`] before stepping.
    pub fn at(&self, i: usize) -> f64 {
        match self {
            PriceSignal::Flat(price) => *price,
            PriceSignal::Series(prices) => prices[i],
        }
    }

    /// Representative scalar rate: the value itself, or the series mean.
    pub fn mean(&self) -> f64 {
        match self {
            PriceSignal::Flat(price) => *price,
            PriceSignal::Series(prices) if prices.is_empty() => 0.0,
            PriceSignal::Series(prices) => prices.iter().sum::<f64>() / prices.len() as f64,
        }
    }

    /// Sum of `quantities[i] * price(i)`.
    pub fn cost_of(&self, quantities: impl Iterator<Item = f64>) -> f64 {
        match self {
            PriceSignal::Flat(price) => quantities.sum::<f64>() * price,
            PriceSignal::Series(prices) => quantities.zip(prices).map(|(q, p)| q * p).sum(),
        }
    }

    fn check(&self, name: &'static str, expected: usize) -> Result<()> {
        match self {
            PriceSignal::Series(prices) if prices.len() != expected => {
                Err(SizingError::PriceLength {
                    name,
                    expected,
                    actual: prices.len(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl From<f64> for PriceSignal {
    fn from(price: f64) -> Self {
        PriceSignal::Flat(price)
    }
}

/// Grid import price and feed-in remuneration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tariff {
    /// Price paid per imported kWh.
    pub grid: PriceSignal,
    /// Remuneration per exported kWh.
    pub feed_in: PriceSignal,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            grid: PriceSignal::Flat(0.30),
            feed_in: PriceSignal::Flat(0.08),
        }
    }
}

impl Tariff {
    pub fn flat(grid: f64, feed_in: f64) -> Self {
        Self {
            grid: PriceSignal::Flat(grid),
            feed_in: PriceSignal::Flat(feed_in),
        }
    }

    /// Checks that per-step price series match the profile length.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::PriceLength`] for the first mismatching series.
    pub fn check(&self, periods: usize) -> Result<()> {
        self.grid.check("grid", periods)?;
        self.feed_in.check("feed-in", periods)
    }
}

/// Battery parameters for one simulation run.
///
/// SOC percentages refer to the aged capacity of the simulated year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Nominal capacity (kWh, >= 0).
    pub capacity_kwh: f64,
    /// Charge efficiency in (0, 1].
    pub efficiency_charge: f64,
    /// Discharge efficiency in (0, 1].
    pub efficiency_discharge: f64,
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f64,
    /// Initial state of charge (% of aged capacity).
    pub initial_soc_pct: f64,
    /// Lower SOC bound (% of aged capacity).
    pub min_soc_pct: f64,
    /// Upper SOC bound (% of aged capacity).
    pub max_soc_pct: f64,
    /// Annual capacity loss (%/year).
    pub annual_capacity_loss_pct: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 10.0,
            efficiency_charge: 0.95,
            efficiency_discharge: 0.95,
            max_charge_kw: 5.0,
            max_discharge_kw: 5.0,
            initial_soc_pct: 50.0,
            min_soc_pct: 10.0,
            max_soc_pct: 90.0,
            annual_capacity_loss_pct: 1.0,
        }
    }
}

impl BatteryConfig {
    /// The zero-capacity battery of the reference scenario.
    pub fn disabled() -> Self {
        Self {
            capacity_kwh: 0.0,
            efficiency_charge: 1.0,
            efficiency_discharge: 1.0,
            max_charge_kw: 0.0,
            max_discharge_kw: 0.0,
            initial_soc_pct: 0.0,
            min_soc_pct: 0.0,
            max_soc_pct: 100.0,
            annual_capacity_loss_pct: 0.0,
        }
    }

    /// Same parameters with a different nominal capacity and power rating.
    pub fn sized(&self, capacity_kwh: f64, max_charge_kw: f64, max_discharge_kw: f64) -> Self {
        Self {
            capacity_kwh,
            max_charge_kw,
            max_discharge_kw,
            ..self.clone()
        }
    }

    /// Capacity remaining in `sim_year` (1-based).
    pub fn aged_capacity_kwh(&self, sim_year: u32) -> f64 {
        let exponent = sim_year.saturating_sub(1) as i32;
        self.capacity_kwh * (1.0 - self.annual_capacity_loss_pct / 100.0).powi(exponent)
    }

    /// Validates all fields.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::InvalidSocWindow`] when `min_soc_pct >=
    /// max_soc_pct`, and [`SizingError::InvalidParameter`] for any other
    /// field outside its domain.
    pub fn validate(&self) -> Result<()> {
        if self.min_soc_pct >= self.max_soc_pct {
            return Err(SizingError::InvalidSocWindow {
                min_pct: self.min_soc_pct,
                max_pct: self.max_soc_pct,
            });
        }
        let checks: [(&'static str, f64, bool, &'static str); 8] = [
            ("capacity_kwh", self.capacity_kwh, self.capacity_kwh >= 0.0, "must be >= 0"),
            (
                "efficiency_charge",
                self.efficiency_charge,
                self.efficiency_charge > 0.0 && self.efficiency_charge <= 1.0,
                "must be in (0, 1]",
            ),
            (
                "efficiency_discharge",
                self.efficiency_discharge,
                self.efficiency_discharge > 0.0 && self.efficiency_discharge <= 1.0,
                "must be in (0, 1]",
            ),
            ("max_charge_kw", self.max_charge_kw, self.max_charge_kw >= 0.0, "must be >= 0"),
            (
                "max_discharge_kw",
                self.max_discharge_kw,
                self.max_discharge_kw >= 0.0,
                "must be >= 0",
            ),
            (
                "min_soc_pct",
                self.min_soc_pct,
                (0.0..=100.0).contains(&self.min_soc_pct),
                "must be in [0, 100]",
            ),
            (
                "max_soc_pct",
                self.max_soc_pct,
                (0.0..=100.0).contains(&self.max_soc_pct),
                "must be in [0, 100]",
            ),
            (
                "annual_capacity_loss_pct",
                self.annual_capacity_loss_pct,
                (0.0..100.0).contains(&self.annual_capacity_loss_pct),
                "must be in [0, 100)",
            ),
        ];
        for (field, value, ok, constraint) in checks {
            if !ok || !value.is_finite() {
                return Err(SizingError::InvalidParameter {
                    field,
                    value,
                    constraint,
                });
            }
        }
        if !(0.0..=100.0).contains(&self.initial_soc_pct) {
            return Err(SizingError::InvalidParameter {
                field: "initial_soc_pct",
                value: self.initial_soc_pct,
                constraint: "must be in [0, 100]",
            });
        }
        Ok(())
    }
}

/// Energy flows of one interval, all in kWh.
///
/// Per step: `generation = direct_self_consumption + battery_charge +
/// grid_export` and `consumption = direct_self_consumption +
/// battery_discharge + grid_import`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlowRecord {
    pub generation_kwh: f64,
    pub consumption_kwh: f64,
    /// SOC after this step.
    pub soc_kwh: f64,
    /// Gross energy taken from generation, losses included.
    pub battery_charge_kwh: f64,
    /// Net energy delivered to the load, after losses.
    pub battery_discharge_kwh: f64,
    pub charge_losses_kwh: f64,
    pub discharge_losses_kwh: f64,
    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
    pub direct_self_consumption_kwh: f64,
}

impl fmt::Display for FlowRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gen={:>7.3} cons={:>7.3} | direct={:.3} charge={:.3} discharge={:.3} \
             (loss {:.3}/{:.3}) | import={:.3} export={:.3} | SoC={:.3} kWh",
            self.generation_kwh,
            self.consumption_kwh,
            self.direct_self_consumption_kwh,
            self.battery_charge_kwh,
            self.battery_discharge_kwh,
            self.charge_losses_kwh,
            self.discharge_losses_kwh,
            self.grid_import_kwh,
            self.grid_export_kwh,
            self.soc_kwh,
        )
    }
}
