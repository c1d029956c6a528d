//! Investment, savings, payback, NPV and IRR of one battery size.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cashflow::{CashFlows, payback_period};
use crate::catalog::CostCurve;
use crate::error::{Result, SizingError};
use crate::sim::engine::{SimulationResult, simulate};
use crate::sim::types::{BatteryConfig, Profile, Tariff};

/// Project-level economic parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinanceParams {
    /// Project lifetime in years (>= 1).
    pub lifetime_years: u32,
    /// Discount rate for NPV and present values (e.g. 0.02).
    pub discount_rate: f64,
    /// Imputed interest rate of the contribution margin (e.g. 0.03).
    pub interest_rate: f64,
}

impl Default for FinanceParams {
    fn default() -> Self {
        Self {
            lifetime_years: 15,
            discount_rate: 0.02,
            interest_rate: 0.03,
        }
    }
}

impl FinanceParams {
    /// # Errors
    ///
    /// Returns [`SizingError::InvalidParameter`] for a zero lifetime or a
    /// discount rate at or below -100 %.
    pub fn validate(&self) -> Result<()> {
        if self.lifetime_years == 0 {
            return Err(SizingError::InvalidParameter {
                field: "lifetime_years",
                value: 0.0,
                constraint: "must be >= 1",
            });
        }
        if !self.discount_rate.is_finite() || self.discount_rate <= -1.0 {
            return Err(SizingError::InvalidParameter {
                field: "discount_rate",
                value: self.discount_rate,
                constraint: "must be > -1",
            });
        }
        if !self.interest_rate.is_finite() {
            return Err(SizingError::InvalidParameter {
                field: "interest_rate",
                value: self.interest_rate,
                constraint: "must be finite",
            });
        }
        Ok(())
    }
}

/// Grid totals of the zero-capacity baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceScenario {
    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
}

impl ReferenceScenario {
    pub fn from_totals(grid_import_kwh: f64, grid_export_kwh: f64) -> Self {
        Self {
            grid_import_kwh,
            grid_export_kwh,
        }
    }

    pub fn from_simulation(result: &SimulationResult) -> Self {
        Self::from_totals(
            result.kpis().total_grid_import_kwh,
            result.kpis().total_grid_export_kwh,
        )
    }

    /// Simulates the profile without a battery.
    ///
    /// # Errors
    ///
    /// Propagates [`simulate`] errors.
    pub fn simulate(profile: &Profile, tariff: &Tariff) -> Result<Self> {
        simulate(profile, &BatteryConfig::disabled(), tariff, 1).map(|r| Self::from_simulation(&r))
    }

    /// Explicit totals win; otherwise the profile is simulated.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::MissingReference`] when neither is available.
    pub fn resolve(
        explicit: Option<ReferenceScenario>,
        profile: Option<&Profile>,
        tariff: &Tariff,
    ) -> Result<Self> {
        match (explicit, profile) {
            (Some(reference), _) => Ok(reference),
            (None, Some(profile)) => Self::simulate(profile, tariff),
            (None, None) => Err(SizingError::MissingReference),
        }
    }

    /// `(reference - with_battery)` for import and export.
    pub fn reductions(&self, result: &SimulationResult) -> (f64, f64) {
        (
            self.grid_import_kwh - result.kpis().total_grid_import_kwh,
            self.grid_export_kwh - result.kpis().total_grid_export_kwh,
        )
    }
}

/// Economic KPIs of one capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialKpis {
    pub capacity_kwh: f64,
    pub investment_cost: f64,
    pub annual_savings: f64,
    pub savings_from_reduced_import: f64,
    pub loss_from_reduced_export: f64,
    pub reduced_grid_import_kwh: f64,
    pub reduced_grid_export_kwh: f64,
    /// Years to break even, `NaN` without investment, 999 if never.
    pub payback_period_years: f64,
    pub npv: f64,
    /// IRR in percent, `NaN` when it does not exist.
    pub irr_pct: f64,
}

impl FinancialKpis {
    /// Result of the zero-capacity reference case.
    pub fn zero() -> Self {
        Self {
            capacity_kwh: 0.0,
            investment_cost: 0.0,
            annual_savings: 0.0,
            savings_from_reduced_import: 0.0,
            loss_from_reduced_export: 0.0,
            reduced_grid_import_kwh: 0.0,
            reduced_grid_export_kwh: 0.0,
            payback_period_years: f64::NAN,
            npv: 0.0,
            irr_pct: f64::NAN,
        }
    }
}

/// Evaluates `sim` (run with `capacity_kwh`) against the reference.
///
/// Per-step price series enter the savings as their mean.
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
) -> Result<FinancialKpis> {
    if capacity_kwh == 0.0 {
        return Ok(FinancialKpis::zero());
    }
    params.validate()?;
    let investment = cost_curve.cost(capacity_kwh)?;

    let (reduced_import, reduced_export) = reference.reductions(sim);
    let savings_from_import = reduced_import * tariff.grid.mean();
    let loss_from_export = reduced_export * tariff.feed_in.mean();
    let annual_savings = savings_from_import - loss_from_export;

    let flows = CashFlows::from_savings(
        investment,
        annual_savings,
        params.lifetime_years,
        annual_capacity_loss_pct,
    );
    let payback = payback_period(
        investment,
        annual_savings,
        params.lifetime_years,
        annual_capacity_loss_pct,
    );
    let npv = flows.npv(params.discount_rate);
    let irr = flows.irr();

    debug!(
        capacity_kwh,
        investment, annual_savings, payback, npv, irr, "financial evaluation"
    );

    Ok(FinancialKpis {
        capacity_kwh,
        investment_cost: investment,
        annual_savings,
        savings_from_reduced_import: savings_from_import,
        loss_from_reduced_export: loss_from_export,
        reduced_grid_import_kwh: reduced_import,
        reduced_grid_export_kwh: reduced_export,
        payback_period_years: payback,
        npv,
        irr_pct: irr * 100.0,
    })
}
