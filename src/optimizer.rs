//! Capacity sweep over simulation, balance check, and both evaluators.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{CostCurve, PowerTable};
use crate::error::{Result, SizingError};
use crate::finance::evaluator::{self, FinanceParams, FinancialKpis, ReferenceScenario};
use crate::finance::margin::{self, ContributionMargin};
use crate::sim::balance::{self, BalanceReport, DEFAULT_TOLERANCE_PCT};
use crate::sim::engine::{SimulationResult, simulate};
use crate::sim::kpi::SimulationKpis;
use crate::sim::types::{BatteryConfig, Profile, Tariff};

/// Inclusive capacity range in kWh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepRange {
    pub min_kwh: f64,
    pub max_kwh: f64,
    pub step_kwh: f64,
    /// Ranking criterion for [`best`].
    pub criterion: Criterion,
}

impl Default for SweepRange {
    fn default() -> Self {
        Self {
            min_kwh: 0.0,
            max_kwh: 20.0,
            step_kwh: 1.0,
            criterion: Criterion::default(),
        }
    }
}

impl SweepRange {
    pub fn new(min_kwh: f64, max_kwh: f64, step_kwh: f64) -> Self {
        Self {
            min_kwh,
            max_kwh,
            step_kwh,
            criterion: Criterion::default(),
        }
    }

    /// # Errors
    ///
    /// Returns [`SizingError::InvalidParameter`] unless `0 <= min <= max` and
    /// `step > 0`.
    pub fn validate(&self) -> Result<()> {
        if !self.step_kwh.is_finite() || self.step_kwh <= 0.0 {
            return Err(SizingError::InvalidParameter {
                field: "step_kwh",
                value: self.step_kwh,
                constraint: "must be > 0",
            });
        }
        if self.min_kwh.is_nan() || self.min_kwh < 0.0 {
            return Err(SizingError::InvalidParameter {
                field: "min_kwh",
                value: self.min_kwh,
                constraint: "must be >= 0",
            });
        }
        if !self.max_kwh.is_finite() || self.max_kwh < self.min_kwh {
            return Err(SizingError::InvalidParameter {
                field: "max_kwh",
                value: self.max_kwh,
                constraint: "must be >= min_kwh",
            });
        }
        Ok(())
    }

    /// Capacities `min, min + step, ...` up to and including `max`.
    ///
    /// Values are computed by index so accumulated steps do not drift past
    /// the upper bound.
    pub fn capacities(&self) -> Vec<f64> {
        let count = ((self.max_kwh - self.min_kwh) / self.step_kwh + 1e-9).floor() as usize;
        (0..=count)
            .map(|i| self.min_kwh + i as f64 * self.step_kwh)
            .collect()
    }
}

/// Score used to pick the best candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Db3Nominal,
    #[default]
    Db3PresentValue,
    Npv,
}

impl Criterion {
    pub fn score(self, candidate: &OptimizationCandidate) -> f64 {
        match self {
            Criterion::Db3Nominal => candidate.margin.total_db3_nominal,
            Criterion::Db3PresentValue => candidate.margin.total_db3_present_value,
            Criterion::Npv => candidate.financial.npv,
        }
    }
}

/// One swept capacity with every KPI of its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationCandidate {
    pub capacity_kwh: f64,
    pub max_charge_kw: f64,
    pub max_discharge_kw: f64,
    pub simulation: SimulationKpis,
    pub balance: BalanceReport,
    pub financial: FinancialKpis,
    pub margin: ContributionMargin,
}

impl OptimizationCandidate {
    /// Generation consumed on site, directly or through the battery.
    pub fn self_consumption_kwh(&self) -> f64 {
        self.simulation.total_direct_self_consumption_kwh
            + self.simulation.total_battery_discharge_kwh
    }

    pub fn battery_losses_kwh(&self) -> f64 {
        self.simulation.total_charge_losses_kwh + self.simulation.total_discharge_losses_kwh
    }
}

/// Highest-scoring candidate. The first one wins ties; `NaN` scores are skipped.
pub fn best(
    candidates: &[OptimizationCandidate],
    criterion: Criterion,
) -> Option<&OptimizationCandidate> {
    let mut winner: Option<(f64, &OptimizationCandidate)> = None;
    for candidate in candidates {
        let score = criterion.score(candidate);
        if score.is_nan() {
            continue;
        }
        match winner {
            Some((best_score, _)) if score <= best_score => {}
            _ => winner = Some((score, candidate)),
        }
    }
    winner.map(|(_, candidate)| candidate)
}

/// Shared, read-only inputs of a capacity sweep.
pub struct CapacityOptimizer<'a> {
    profile: &'a Profile,
    battery: &'a BatteryConfig,
    tariff: &'a Tariff,
    cost_curve: &'a CostCurve,
    params: &'a FinanceParams,
    power_table: Option<&'a PowerTable>,
    tolerance_pct: f64,
}

impl<'a> CapacityOptimizer<'a> {
    /// `battery` supplies every parameter except the swept capacity.
    pub fn new(
        profile: &'a Profile,
        battery: &'a BatteryConfig,
        tariff: &'a Tariff,
        cost_curve: &'a CostCurve,
        params: &'a FinanceParams,
    ) -> Self {
        Self {
            profile,
            battery,
            tariff,
            cost_curve,
            params,
            power_table: None,
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
        }
    }

    /// Resolves per-capacity power from `table` instead of the fixed rating.
    pub fn with_power_table(mut self, table: &'a PowerTable) -> Self {
        self.power_table = Some(table);
        self
    }

    pub fn with_tolerance(mut self, tolerance_pct: f64) -> Self {
        self.tolerance_pct = tolerance_pct;
        self
    }

    /// Evaluates every capacity of `range` in order.
    ///
    /// The zero-capacity reference runs once and is shared by all
    /// candidates; a swept capacity of zero reuses it.
    ///
    /// # Errors
    ///
    /// Fails on an invalid range or parameters, and on the first candidate
    /// whose cost lookup fails.
    pub fn run(&self, range: &SweepRange) -> Result<Vec<OptimizationCandidate>> {
        range.validate()?;
        self.battery.validate()?;
        self.params.validate()?;

        let reference_sim = simulate(self.profile, &BatteryConfig::disabled(), self.tariff, 1)?;
        let reference = ReferenceScenario::from_simulation(&reference_sim);
        let capacities = range.capacities();
        info!(
            candidates = capacities.len(),
            min_kwh = range.min_kwh,
            max_kwh = range.max_kwh,
            step_kwh = range.step_kwh,
            resolution = reference_sim.metadata().resolution,
            "capacity sweep started"
        );

        let candidates = capacities
            .par_iter()
            .map(|&capacity| self.evaluate(capacity, &reference_sim, &reference))
            .collect::<Result<Vec<_>>>()?;

        if let Some(winner) = best(&candidates, range.criterion) {
            info!(
                capacity_kwh = winner.capacity_kwh,
                score = range.criterion.score(winner),
                criterion = ?range.criterion,
                "capacity sweep finished"
            );
        }
        Ok(candidates)
    }

    fn evaluate(
        &self,
        capacity_kwh: f64,
        reference_sim: &SimulationResult,
        reference: &ReferenceScenario,
    ) -> Result<OptimizationCandidate> {
        let (max_charge_kw, max_discharge_kw) = match self.power_table {
            Some(table) if capacity_kwh > 0.0 => table.power_for(
                capacity_kwh,
                self.battery.max_charge_kw,
                self.battery.max_discharge_kw,
            ),
            _ => (self.battery.max_charge_kw, self.battery.max_discharge_kw),
        };
        let battery = self.battery.sized(capacity_kwh, max_charge_kw, max_discharge_kw);

        let owned;
        let sim = if capacity_kwh == 0.0 {
            reference_sim
        } else {
            owned = simulate(self.profile, &battery, self.tariff, 1)?;
            &owned
        };

        let balance = balance::validate(
            sim,
            battery.efficiency_charge,
            battery.efficiency_discharge,
            self.tolerance_pct,
        );
        let loss_pct = battery.annual_capacity_loss_pct;
        let financial = evaluator::evaluate(
            sim,
            capacity_kwh,
            self.cost_curve,
            self.params,
            loss_pct,
            reference,
            self.tariff,
        )?;
        let margin = margin::evaluate(
            sim,
            capacity_kwh,
            self.cost_curve,
            self.params,
            loss_pct,
            reference,
            self.tariff,
        )?;

        debug!(
            capacity_kwh,
            max_charge_kw,
            max_discharge_kw,
            autarky = sim.kpis().autarky_rate,
            npv = financial.npv,
            db3_pv = margin.total_db3_present_value,
            balance_ok = balance.all_ok(),
            "candidate evaluated"
        );

        Ok(OptimizationCandidate {
            capacity_kwh,
            max_charge_kw,
            max_discharge_kw,
            simulation: sim.kpis().clone(),
            balance,
            financial,
            margin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacities_are_inclusive() {
        assert_eq!(
            SweepRange::new(0.0, 10.0, 2.5).capacities(),
            vec![0.0, 2.5, 5.0, 7.5, 10.0]
        );
        assert_eq!(SweepRange::new(3.0, 3.0, 1.0).capacities(), vec![3.0]);
        let tenths = SweepRange::new(0.0, 1.0, 0.1).capacities();
        assert_eq!(tenths.len(), 11);
        assert!((tenths[10] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn range_validation() {
        assert!(SweepRange::new(0.0, 10.0, 0.0).validate().is_err());
        assert!(SweepRange::new(5.0, 1.0, 1.0).validate().is_err());
        assert!(SweepRange::new(-1.0, 1.0, 1.0).validate().is_err());
        assert!(SweepRange::default().validate().is_ok());
    }

    #[test]
    fn criterion_deserializes_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            criterion: Criterion,
        }
        let parsed: Wrapper = toml::from_str("criterion = \"db3_nominal\"").expect("valid toml");
        assert_eq!(parsed.criterion, Criterion::Db3Nominal);
        assert_eq!(Criterion::default(), Criterion::Db3PresentValue);
    }
}
