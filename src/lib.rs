//! Battery storage sizing for a household load and PV generation profile.
//!
//! A yearly profile is dispatched through a greedy battery model for each
//! candidate capacity, checked for energy conservation, and scored by a
//! cash-flow evaluator (NPV, IRR, payback) and a contribution-margin
//! waterfall (DB I/II/III).

/// Capacity-keyed cost curve and power table.
pub mod catalog;
pub mod config;
pub mod error;
pub mod finance;
pub mod io;
pub mod optimizer;
pub mod profile;
/// Resolution detection, dispatch simulation, KPIs and balance checks.
pub mod sim;
pub mod telemetry;

pub use error::{Result, SizingError};
