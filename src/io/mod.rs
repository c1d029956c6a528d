//! CSV glue between files and the sizing core.

pub mod export;
pub mod import;
