//! Input profiles that do not come from a CSV file.

pub mod synthetic;

pub use synthetic::SyntheticProfile;
