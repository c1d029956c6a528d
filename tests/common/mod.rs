//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use bess_sizer::catalog::CostCurve;
use bess_sizer::profile::SyntheticProfile;
use bess_sizer::sim::types::{BatteryConfig, Profile};

/// Hours in a non-leap year.
pub const HOURS: usize = 8760;

/// Constant hourly generation and consumption.
pub fn flat_profile(generation_kwh: f64, consumption_kwh: f64) -> Profile {
    Profile::new(vec![generation_kwh; HOURS], vec![consumption_kwh; HOURS])
        .expect("flat profile is valid")
}

/// Midday surplus, evening demand: every day identical.
pub fn day_night_profile() -> Profile {
    let generation = (0..HOURS)
        .map(|h| if (10..15).contains(&(h % 24)) { 2.0 } else { 0.0 })
        .collect();
    let consumption = (0..HOURS)
        .map(|h| if (18..23).contains(&(h % 24)) { 1.2 } else { 0.2 })
        .collect();
    Profile::new(generation, consumption).expect("day/night profile is valid")
}

/// The default seeded demo year (hourly, seed 42).
pub fn synthetic_profile() -> Profile {
    SyntheticProfile::default()
        .generate()
        .expect("default synthetic profile is valid")
}

/// Lossless battery spanning the full SOC range, starting empty.
pub fn ideal_battery(capacity_kwh: f64) -> BatteryConfig {
    BatteryConfig {
        capacity_kwh,
        efficiency_charge: 1.0,
        efficiency_discharge: 1.0,
        max_charge_kw: 100.0,
        max_discharge_kw: 100.0,
        initial_soc_pct: 0.0,
        min_soc_pct: 0.0,
        max_soc_pct: 100.0,
        annual_capacity_loss_pct: 0.0,
    }
}

/// Default battery with the given capacity.
pub fn default_battery(capacity_kwh: f64) -> BatteryConfig {
    BatteryConfig {
        capacity_kwh,
        ..BatteryConfig::default()
    }
}

/// 1500 EUR fixed plus 550 EUR per kWh over the full catalogue.
pub fn demo_curve() -> CostCurve {
    CostCurve::linear(1500.0, 550.0)
}
