//! Capacity-keyed lookup tables: investment cost and rated power.

use std::collections::BTreeMap;
use std::io::Read;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, SizingError};

/// Smallest capacity with a cost entry (kWh).
pub const MIN_CAPACITY_KWH: u32 = 1;
/// Largest capacity with a cost entry (kWh).
pub const MAX_CAPACITY_KWH: u32 = 200;

fn in_domain(capacity: f64) -> bool {
    capacity >= f64::from(MIN_CAPACITY_KWH) && capacity <= f64::from(MAX_CAPACITY_KWH)
}

/// Investment cost per integer capacity, dense over `1..=200` kWh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostCurve {
    entries: BTreeMap<u32, f64>,
}

#[derive(Debug, Deserialize)]
struct CostRow {
    capacity_kwh: f64,
    total_cost_eur: f64,
}

impl CostCurve {
    /// Builds a curve from `(capacity, cost)` pairs.
    ///
    /// Capacities are rounded. Entries outside the domain or with a
    /// non-positive cost are skipped, and the first entry per capacity wins.
    pub fn from_entries(entries: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut curve = Self::default();
        for (capacity, cost) in entries {
            if !in_domain(capacity) || !cost.is_finite() || cost <= 0.0 {
                continue;
            }
            curve.entries.entry(capacity.round_ties_even() as u32).or_insert(cost);
        }
        curve
    }

    /// Reads a `capacity_kwh,total_cost_eur` table.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::Csv`] on malformed rows.
    pub fn from_csv_reader(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut rows = Vec::new();
        for row in rdr.deserialize::<CostRow>() {
            let row = row?;
            rows.push((row.capacity_kwh, row.total_cost_eur));
        }
        let curve = Self::from_entries(rows);
        debug!(entries = curve.len(), "cost curve loaded");
        Ok(curve)
    }

    /// A linear demo curve `fixed + per_kwh * capacity` over the full domain.
    pub fn linear(fixed_eur: f64, per_kwh_eur: f64) -> Self {
        Self::from_entries(
            (MIN_CAPACITY_KWH..=MAX_CAPACITY_KWH)
                .map(|c| (f64::from(c), fixed_eur + per_kwh_eur * f64::from(c))),
        )
    }

    /// Investment cost for `capacity_kwh`, rounded to the nearest integer
    /// with halves going to the even neighbour.
    ///
    /// A capacity of exactly zero costs nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::CapacityOutOfRange`] when the rounded capacity
    /// lies outside `1..=200`, and [`SizingError::MissingCostEntry`] when an
    /// in-range capacity has no entry.
    pub fn cost(&self, capacity_kwh: f64) -> Result<f64> {
        if capacity_kwh == 0.0 {
            return Ok(0.0);
        }
        let rounded = capacity_kwh.round_ties_even() as i64;
        if rounded < i64::from(MIN_CAPACITY_KWH) || rounded > i64::from(MAX_CAPACITY_KWH) {
            return Err(SizingError::CapacityOutOfRange { capacity: rounded });
        }
        let capacity = rounded as u32;
        self.entries
            .get(&capacity)
            .copied()
            .ok_or(SizingError::MissingCostEntry { capacity })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rated power of one catalogue entry. Missing values fall back to the
/// configured battery power.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PowerRating {
    pub max_charge_kw: Option<f64>,
    pub max_discharge_kw: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PowerRow {
    capacity_kwh: f64,
    #[serde(default)]
    max_charge_kw: Option<f64>,
    #[serde(default)]
    max_discharge_kw: Option<f64>,
    #[serde(default)]
    c_rate: Option<f64>,
}

/// Optional capacity to rated power table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerTable {
    entries: BTreeMap<u32, PowerRating>,
}

impl PowerTable {
    /// Inserts an entry. A repeated capacity only fills fields still missing.
    pub fn insert(&mut self, capacity_kwh: u32, rating: PowerRating) {
        let slot = self.entries.entry(capacity_kwh).or_default();
        slot.max_charge_kw = slot.max_charge_kw.or(rating.max_charge_kw);
        slot.max_discharge_kw = slot.max_discharge_kw.or(rating.max_discharge_kw);
    }

    /// Reads a `capacity_kwh,max_charge_kw,max_discharge_kw[,c_rate]` table.
    ///
    /// Power columns may be empty; a C-rate fills them as `c_rate * capacity`.
    /// Rows outside `1..=200` kWh or without any power value are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::Csv`] on malformed rows.
    pub fn from_csv_reader(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut table = Self::default();
        for row in rdr.deserialize::<PowerRow>() {
            let row = row?;
            if !in_domain(row.capacity_kwh) {
                continue;
            }
            let capacity = row.capacity_kwh.round_ties_even() as u32;
            let from_c_rate = row.c_rate.map(|c| c * f64::from(capacity));
            let rating = PowerRating {
                max_charge_kw: row.max_charge_kw.or(from_c_rate),
                max_discharge_kw: row.max_discharge_kw.or(from_c_rate),
            };
            if rating.max_charge_kw.is_some() || rating.max_discharge_kw.is_some() {
                table.insert(capacity, rating);
            }
        }
        debug!(entries = table.len(), "power table loaded");
        Ok(table)
    }

    /// Exact entry for the rounded capacity, else the key nearest to the
    /// rounded capacity.
    ///
    /// Rounding is half to even. Ties between keys go to the smaller capacity.
    pub fn resolve(&self, capacity_kwh: f64) -> Option<PowerRating> {
        let target = capacity_kwh.round_ties_even();
        let mut best: Option<(f64, PowerRating)> = None;
        for (&key, &rating) in &self.entries {
            let distance = (f64::from(key) - target).abs();
            match best {
                Some((d, _)) if distance >= d => {}
                _ => best = Some((distance, rating)),
            }
        }
        best.map(|(_, rating)| rating)
    }

    /// Charge and discharge power for `capacity_kwh`, falling back per field.
    pub fn power_for(
        &self,
        capacity_kwh: f64,
        fallback_charge_kw: f64,
        fallback_discharge_kw: f64,
    ) -> (f64, f64) {
        let rating = self.resolve(capacity_kwh).unwrap_or_default();
        (
            rating.max_charge_kw.unwrap_or(fallback_charge_kw),
            rating.max_discharge_kw.unwrap_or(fallback_discharge_kw),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
