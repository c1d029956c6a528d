/// Energy balance validation of finished runs.
pub mod balance;
pub mod engine;
pub mod kpi;
/// Sample-count resolution detection.
pub mod resolution;
pub mod types;
