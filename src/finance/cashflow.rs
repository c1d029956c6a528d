//! Degrading cash-flow series with NPV, IRR and payback.

use tracing::debug;

/// Payback reported when the investment never breaks even.
pub const NO_BREAK_EVEN_YEARS: f64 = 999.0;

const IRR_INITIAL_GUESS: f64 = 0.10;
const IRR_TOLERANCE: f64 = 1e-6;
const IRR_MAX_ITERATIONS: usize = 100;
const IRR_MIN_RATE: f64 = -0.99;
const IRR_MAX_RATE: f64 = 10.0;

/// Savings factor of project year `year` (1-based): `(1 - loss/100)^(year-1)`.
pub fn degradation_factor(annual_capacity_loss_pct: f64, year: u32) -> f64 {
    (1.0 - annual_capacity_loss_pct / 100.0).powi(year.saturating_sub(1) as i32)
}

/// Cash flows indexed by year; index 0 is the (negative) investment.
#[derive(Debug, Clone, PartialEq)]
pub struct CashFlows(Vec<f64>);

impl CashFlows {
    pub fn new(flows: Vec<f64>) -> Self {
        Self(flows)
    }

    /// `[-investment, s·d(1), …, s·d(lifetime)]` with degradation `d`.
    pub fn from_savings(
        investment: f64,
        annual_value: f64,
        lifetime_years: u32,
        annual_capacity_loss_pct: f64,
    ) -> Self {
        let mut flows = Vec::with_capacity(lifetime_years as usize + 1);
        flows.push(-investment);
        flows.extend(
            (1..=lifetime_years)
                .map(|year| annual_value * degradation_factor(annual_capacity_loss_pct, year)),
        );
        Self(flows)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// `Σ cf[t] / (1 + rate)^t`.
    pub fn npv(&self, rate: f64) -> f64 {
        self.0
            .iter()
            .enumerate()
            .map(|(t, cf)| cf / (1.0 + rate).powi(t as i32))
            .sum()
    }

    fn npv_derivative(&self, rate: f64) -> f64 {
        self.0
            .iter()
            .enumerate()
            .skip(1)
            .map(|(t, cf)| -(t as f64) * cf / (1.0 + rate).powi(t as i32 + 1))
            .sum()
    }

    /// Internal rate of return by Newton-Raphson from a 10 % guess.
    ///
    /// Returns `NaN` for fewer than two flows, when the iterate leaves
    /// `[-99 %, 1000 %]`, or when it has not converged after 100 iterations.
    ///
    /// When the derivative falls below the tolerance the iteration stops but
    /// the current rate is not returned as is. The result is that rate only
    /// if its NPV is already within the tolerance, otherwise `NaN`.
    pub fn irr(&self) -> f64 {
        if self.0.len() < 2 {
            return f64::NAN;
        }
        let mut rate = IRR_INITIAL_GUESS;
        for _ in 0..IRR_MAX_ITERATIONS {
            let npv = self.npv(rate);
            let derivative = self.npv_derivative(rate);
            if derivative.abs() < IRR_TOLERANCE {
                if npv.abs() < IRR_TOLERANCE {
                    return rate;
                }
                debug!(rate, npv, "irr derivative vanished");
                return f64::NAN;
            }
            let next = rate - npv / derivative;
            if !next.is_finite() || !(IRR_MIN_RATE..=IRR_MAX_RATE).contains(&next) {
                debug!(rate = next, "irr left the admissible range");
                return f64::NAN;
            }
            if (next - rate).abs() < IRR_TOLERANCE {
                return next;
            }
            rate = next;
        }
        debug!(rate, "irr did not converge");
        f64::NAN
    }
}

/// Years until cumulative degraded savings cover `investment`.
///
/// The break-even year is interpolated as `previous_year + remaining /
/// that_year_savings`. Returns [`NO_BREAK_EVEN_YEARS`] when savings are not
/// positive or break-even lies beyond `lifetime_years`.
pub fn payback_period(
    investment: f64,
    annual_value: f64,
    lifetime_years: u32,
    annual_capacity_loss_pct: f64,
) -> f64 {
    if annual_value <= 0.0 {
        return NO_BREAK_EVEN_YEARS;
    }
    let mut cumulative = 0.0;
    for year in 1..=lifetime_years {
        let year_value = annual_value * degradation_factor(annual_capacity_loss_pct, year);
        let previous = cumulative;
        cumulative += year_value;
        if cumulative >= investment {
            return f64::from(year - 1) + (investment - previous) / year_value;
        }
    }
    NO_BREAK_EVEN_YEARS
}
