//! Economic evaluation of simulated battery sizes.

pub mod cashflow;
pub mod evaluator;
/// DB I/II/III contribution-margin waterfall.
pub mod margin;

pub use cashflow::{CashFlows, NO_BREAK_EVEN_YEARS};
pub use evaluator::{FinanceParams, FinancialKpis, ReferenceScenario};
pub use margin::ContributionMargin;
