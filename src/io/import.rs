//! CSV import for yearly profiles and capacity tables.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::catalog::{CostCurve, PowerTable};
use crate::error::{Result, SizingError};
use crate::sim::types::{PriceSignal, Profile, Tariff};

#[derive(Debug, Deserialize)]
struct ProfileRow {
    generation_kwh: f64,
    consumption_kwh: f64,
    #[serde(default)]
    grid_price: Option<f64>,
    #[serde(default)]
    feed_in_price: Option<f64>,
}

/// A profile read from CSV plus any per-interval prices it carried.
#[derive(Debug, Clone)]
pub struct ImportedProfile {
    pub profile: Profile,
    pub grid_price: Option<Vec<f64>>,
    pub feed_in_price: Option<Vec<f64>>,
}

impl ImportedProfile {
    /// `base` with its prices replaced by the imported series, where present.
    pub fn tariff(&self, base: &Tariff) -> Tariff {
        Tariff {
            grid: self
                .grid_price
                .clone()
                .map_or_else(|| base.grid.clone(), PriceSignal::Series),
            feed_in: self
                .feed_in_price
                .clone()
                .map_or_else(|| base.feed_in.clone(), PriceSignal::Series),
        }
    }
}

/// Collects an optional price column. Either every row has a value or none.
fn price_column(name: &'static str, values: Vec<Option<f64>>) -> Result<Option<Vec<f64>>> {
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }
    values
        .into_iter()
        .enumerate()
        .map(|(index, v)| match v {
            Some(p) if p.is_finite() => Ok(p),
            other => Err(SizingError::InvalidSample {
                series: name,
                index,
                value: other.unwrap_or(f64::NAN),
            }),
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Reads `generation_kwh,consumption_kwh[,grid_price,feed_in_price]` rows.
///
/// The resolution is detected from the row count.
///
/// # Errors
///
/// Returns [`SizingError::Csv`] on malformed rows, [`SizingError::InvalidSample`]
/// when a price column is only partially filled, and every [`Profile::new`]
/// failure.
pub fn read_profile_csv(reader: impl Read) -> Result<ImportedProfile> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut generation = Vec::new();
    let mut consumption = Vec::new();
    let mut grid = Vec::new();
    let mut feed_in = Vec::new();
    for row in rdr.deserialize::<ProfileRow>() {
        let row = row?;
        generation.push(row.generation_kwh);
        consumption.push(row.consumption_kwh);
        grid.push(row.grid_price);
        feed_in.push(row.feed_in_price);
    }
    let profile = Profile::new(generation, consumption)?;
    Ok(ImportedProfile {
        profile,
        grid_price: price_column("grid_price", grid)?,
        feed_in_price: price_column("feed_in_price", feed_in)?,
    })
}

/// Opens and reads a profile CSV file.
///
/// # Errors
///
/// Returns [`SizingError::Io`] if the file cannot be opened, plus every
/// [`read_profile_csv`] failure.
pub fn load_profile(path: &Path) -> Result<ImportedProfile> {
    let imported = read_profile_csv(BufReader::new(File::open(path)?))?;
    info!(
        path = %path.display(),
        resolution = %imported.profile.resolution(),
        periods = imported.profile.len(),
        "profile loaded"
    );
    Ok(imported)
}

/// Opens and reads a `capacity_kwh,total_cost_eur` file.
///
/// # Errors
///
/// Returns [`SizingError::Io`] or [`SizingError::Csv`].
pub fn load_cost_curve(path: &Path) -> Result<CostCurve> {
    CostCurve::from_csv_reader(BufReader::new(File::open(path)?))
}

/// Opens and reads a `capacity_kwh,max_charge_kw,max_discharge_kw[,c_rate]` file.
///
/// # Errors
///
/// Returns [`SizingError::Io`] or [`SizingError::Csv`].
pub fn load_power_table(path: &Path) -> Result<PowerTable> {
    PowerTable::from_csv_reader(BufReader::new(File::open(path)?))
}
