//! Three-tier contribution margin (DB I/II/III) of one battery size.

use serde::Serialize;
use tracing::debug;

use super::cashflow::{degradation_factor, payback_period};
use super::evaluator::{FinanceParams, ReferenceScenario};
use crate::catalog::CostCurve;
use crate::error::Result;
use crate::sim::engine::SimulationResult;
use crate::sim::types::Tariff;

/// Margin waterfall at year-1 values plus lifetime aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionMargin {
    pub capacity_kwh: f64,
    pub investment_cost: f64,
    /// Value of the reduced grid import.
    pub annual_revenue: f64,
    /// Value of the lost feed-in.
    pub annual_variable_costs: f64,
    pub db1: f64,
    pub annual_depreciation: f64,
    pub db2: f64,
    pub annual_interest: f64,
    pub db3: f64,
    pub total_db3_nominal: f64,
    pub total_db3_present_value: f64,
    pub payback_period_years: f64,
    pub roi_pct: f64,
}

impl ContributionMargin {
    pub fn zero() -> Self {
        Self {
            capacity_kwh: 0.0,
            investment_cost: 0.0,
            annual_revenue: 0.0,
            annual_variable_costs: 0.0,
            db1: 0.0,
            annual_depreciation: 0.0,
            db2: 0.0,
            annual_interest: 0.0,
            db3: 0.0,
            total_db3_nominal: 0.0,
            total_db3_present_value: 0.0,
            payback_period_years: f64::NAN,
            roi_pct: f64::NAN,
        }
    }
}

/// Computes the margin waterfall for `sim` against the reference.
///
/// Each year `k` scales DB III by the degradation factor; the present value
/// discounts year `k` by `(1 + discount_rate)^k`.
///
/// # Errors
///
/// Propagates cost curve lookup failures and invalid parameters.
pub fn evaluate(
    sim: &SimulationResult,
    capacity_kwh: f64,
    cost_curve: &CostCurve,
    params: &FinanceParams,
    annual_capacity_loss_pct: f64,
    reference: &ReferenceScenario,
    tariff: &Tariff,
) -> Result<ContributionMargin> {
    if capacity_kwh == 0.0 {
        return Ok(ContributionMargin::zero());
    }
    params.validate()?;
    let investment = cost_curve.cost(capacity_kwh)?;
    let lifetime = params.lifetime_years;

    let (reduced_import, reduced_export) = reference.reductions(sim);
    let revenue = reduced_import * tariff.grid.mean();
    let variable_costs = reduced_export * tariff.feed_in.mean();
    let db1 = revenue - variable_costs;
    let depreciation = investment / f64::from(lifetime);
    let db2 = db1 - depreciation;
    let interest = investment / 2.0 * params.interest_rate;
    let db3 = db2 - interest;

    let mut total_nominal = 0.0;
    let mut total_present = 0.0;
    for year in 1..=lifetime {
        let nominal = db3 * degradation_factor(annual_capacity_loss_pct, year);
        total_nominal += nominal;
        total_present += nominal / (1.0 + params.discount_rate).powi(year as i32);
    }

    let payback = payback_period(investment, db3, lifetime, annual_capacity_loss_pct);
    let roi_pct = if investment > 0.0 {
        total_nominal / f64::from(lifetime) / investment * 100.0
    } else {
        0.0
    };

    debug!(capacity_kwh, db1, db2, db3, total_nominal, total_present, "contribution margin");

    Ok(ContributionMargin {
        capacity_kwh,
        investment_cost: investment,
        annual_revenue: revenue,
        annual_variable_costs: variable_costs,
        db1,
        annual_depreciation: depreciation,
        db2,
        annual_interest: interest,
        db3,
        total_db3_nominal: total_nominal,
        total_db3_present_value: total_present,
        payback_period_years: payback,
        roi_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::cashflow::NO_BREAK_EVEN_YEARS;
    use crate::sim::engine::simulate;
    use crate::sim::types::{BatteryConfig, Profile};

    fn flat_profile() -> Profile {
        Profile::new(vec![0.0; 8760], vec![1.0; 8760]).expect("valid profile")
    }

    /// A run with import 8760 kWh and no export; the reference is chosen so
    /// the reductions are exactly known.
    fn fixture(reduced_import: f64, reduced_export: f64) -> (SimulationResult, ReferenceScenario) {
        let tariff = Tariff::default();
        let sim = simulate(&flat_profile(), &BatteryConfig::disabled(), &tariff, 1).expect("runs");
        let reference = ReferenceScenario::from_totals(8760.0 + reduced_import, reduced_export);
        (sim, reference)
    }

    #[test]
    fn waterfall_tiers() {
        let (sim, reference) = fixture(2000.0, 1000.0);
        let curve = CostCurve::from_entries([(10.0, 6000.0)]);
        let params = FinanceParams {
            lifetime_years: 10,
            discount_rate: 0.0,
            interest_rate: 0.05,
        };
        let m = evaluate(&sim, 10.0, &curve, &params, 0.0, &reference, &Tariff::flat(0.30, 0.10))
            .expect("in range");
        assert!((m.annual_revenue - 600.0).abs() < 1e-9);
        assert!((m.annual_variable_costs - 100.0).abs() < 1e-9);
        assert!((m.db1 - 500.0).abs() < 1e-9);
        assert!((m.annual_depreciation - 600.0).abs() < 1e-9);
        assert!((m.db2 + 100.0).abs() < 1e-9);
        assert!((m.annual_interest - 150.0).abs() < 1e-9);
        assert!((m.db3 + 250.0).abs() < 1e-9);
        assert!((m.total_db3_nominal + 2500.0).abs() < 1e-9);
        assert!((m.total_db3_present_value + 2500.0).abs() < 1e-9);
        assert_eq!(m.payback_period_years, NO_BREAK_EVEN_YEARS);
        assert!((m.roi_pct + 250.0 / 6000.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn present_value_discounts_from_year_one() {
        let (sim, reference) = fixture(10000.0, 0.0);
        let curve = CostCurve::from_entries([(5.0, 1000.0)]);
        let params = FinanceParams {
            lifetime_years: 2,
            discount_rate: 0.10,
            interest_rate: 0.0,
        };
        let m = evaluate(&sim, 5.0, &curve, &params, 0.0, &reference, &Tariff::flat(0.10, 0.0))
            .expect("in range");
        // DB III = 1000 - 500 = 500 per year.
        assert!((m.db3 - 500.0).abs() < 1e-9);
        assert!((m.total_db3_nominal - 1000.0).abs() < 1e-9);
        let pv = 500.0 / 1.1 + 500.0 / 1.21;
        assert!((m.total_db3_present_value - pv).abs() < 1e-9);
        assert!((m.payback_period_years - 2.0).abs() < 1e-9);
        assert!((m.roi_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn degradation_lowers_nominal_total() {
        let (sim, reference) = fixture(10000.0, 0.0);
        let curve = CostCurve::from_entries([(5.0, 1000.0)]);
        let params = FinanceParams {
            lifetime_years: 2,
            discount_rate: 0.0,
            interest_rate: 0.0,
        };
        let m = evaluate(&sim, 5.0, &curve, &params, 10.0, &reference, &Tariff::flat(0.10, 0.0))
            .expect("in range");
        assert!((m.total_db3_nominal - 950.0).abs() < 1e-9);
    }

    #[test]
    fn zero_capacity_is_nan_payback_and_roi() {
        let (sim, reference) = fixture(0.0, 0.0);
        let m = evaluate(
            &sim,
            0.0,
            &CostCurve::default(),
            &FinanceParams::default(),
            1.0,
            &reference,
            &Tariff::default(),
        )
        .expect("zero capacity never fails");
        assert_eq!(m.db3, 0.0);
        assert!(m.payback_period_years.is_nan());
        assert!(m.roi_pct.is_nan());
    }
}
