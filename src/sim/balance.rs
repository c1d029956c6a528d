//! Energy conservation and loss plausibility checks over a flow table.

use serde::Serialize;
use tracing::warn;

use super::engine::SimulationResult;

/// Default deviation tolerance in percent.
pub const DEFAULT_TOLERANCE_PCT: f64 = 0.01;

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceCheck {
    pub passed: bool,
    /// Relative deviation from the expected total, in percent.
    pub deviation_pct: f64,
}

/// Verdict of the four energy balance checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceReport {
    /// `generation == direct + charge + export`.
    pub generation: BalanceCheck,
    /// `consumption == direct + discharge + import`.
    pub consumption: BalanceCheck,
    pub charge_losses: BalanceCheck,
    pub discharge_losses: BalanceCheck,
    pub tolerance_pct: f64,
}

impl BalanceReport {
    pub fn all_ok(&self) -> bool {
        self.generation.passed
            && self.consumption.passed
            && self.charge_losses.passed
            && self.discharge_losses.passed
    }
}

fn deviation_pct(actual: f64, expected: f64) -> f64 {
    if expected > 0.0 {
        (actual - expected).abs() / expected * 100.0
    } else {
        0.0
    }
}

/// Recomputes conservation and expected losses from the flow table.
///
/// Never fails. A failing report is logged and returned to the caller.
pub fn validate(
    result: &SimulationResult,
    efficiency_charge: f64,
    efficiency_discharge: f64,
    tolerance_pct: f64,
) -> BalanceReport {
    let mut generation = 0.0;
    let mut generation_used = 0.0;
    let mut consumption = 0.0;
    let mut consumption_covered = 0.0;
    let mut charge = 0.0;
    let mut discharge = 0.0;
    let mut charge_losses = 0.0;
    let mut discharge_losses = 0.0;
    for r in result.records() {
        generation += r.generation_kwh;
        generation_used += r.direct_self_consumption_kwh + r.battery_charge_kwh + r.grid_export_kwh;
        consumption += r.consumption_kwh;
        consumption_covered +=
            r.direct_self_consumption_kwh + r.battery_discharge_kwh + r.grid_import_kwh;
        charge += r.battery_charge_kwh;
        discharge += r.battery_discharge_kwh;
        charge_losses += r.charge_losses_kwh;
        discharge_losses += r.discharge_losses_kwh;
    }

    let expected_charge_losses = charge * (1.0 - efficiency_charge);
    let expected_discharge_losses = if efficiency_discharge > 0.0 {
        discharge / efficiency_discharge - discharge
    } else {
        0.0
    };

    let check = |deviation: f64, trivially_ok: bool| BalanceCheck {
        passed: deviation <= tolerance_pct || trivially_ok,
        deviation_pct: deviation,
    };
    let report = BalanceReport {
        generation: check(deviation_pct(generation_used, generation), false),
        consumption: check(deviation_pct(consumption_covered, consumption), false),
        charge_losses: check(
            deviation_pct(charge_losses, expected_charge_losses),
            charge == 0.0,
        ),
        discharge_losses: check(
            deviation_pct(discharge_losses, expected_discharge_losses),
            discharge == 0.0,
        ),
        tolerance_pct,
    };

    if !report.all_ok() {
        warn!(
            capacity_kwh = result.kpis().original_capacity_kwh,
            generation_pct = report.generation.deviation_pct,
            consumption_pct = report.consumption.deviation_pct,
            charge_losses_pct = report.charge_losses.deviation_pct,
            discharge_losses_pct = report.discharge_losses.deviation_pct,
            tolerance_pct,
            "energy balance check failed"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::engine::simulate;
    use crate::sim::types::{BatteryConfig, Profile, Tariff};

    fn day_night_profile() -> Profile {
        let generation = (0..8760)
            .map(|h| if (8..16).contains(&(h % 24)) { 3.0 } else { 0.0 })
            .collect();
        let consumption = vec![1.0; 8760];
        Profile::new(generation, consumption).expect("valid profile")
    }

    #[test]
    fn greedy_dispatch_passes_all_checks() {
        let battery = BatteryConfig::default();
        let result = simulate(&day_night_profile(), &battery, &Tariff::default(), 1)
            .expect("simulation runs");
        let report = validate(
            &result,
            battery.efficiency_charge,
            battery.efficiency_discharge,
            DEFAULT_TOLERANCE_PCT,
        );
        assert!(report.all_ok(), "{report:?}");
        assert!(report.generation.deviation_pct < 1e-9);
        assert!(report.consumption.deviation_pct < 1e-9);
    }

    #[test]
    fn wrong_efficiency_is_reported_not_fatal() {
        let battery = BatteryConfig::default();
        let result = simulate(&day_night_profile(), &battery, &Tariff::default(), 1)
            .expect("simulation runs");
        let report = validate(&result, 0.5, battery.efficiency_discharge, DEFAULT_TOLERANCE_PCT);
        assert!(!report.all_ok());
        assert!(!report.charge_losses.passed);
        assert!(report.charge_losses.deviation_pct > 1.0);
        assert!(report.generation.passed);
    }

    #[test]
    fn zero_capacity_passes_trivially() {
        let result = simulate(
            &day_night_profile(),
            &BatteryConfig::disabled(),
            &Tariff::default(),
            1,
        )
        .expect("simulation runs");
        let report = validate(&result, 0.95, 0.95, DEFAULT_TOLERANCE_PCT);
        assert!(report.all_ok());
        assert_eq!(report.charge_losses.deviation_pct, 0.0);
    }
}
