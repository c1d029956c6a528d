//! Greedy self-consumption dispatch over a yearly profile.

use serde::Serialize;
use tracing::debug;

use super::kpi::SimulationKpis;
use super::types::{BatteryConfig, FlowRecord, Profile, Tariff};
use crate::error::{Result, SizingError};

/// Per-run battery state with SOC bounds derived from the aged capacity.
///
/// Bounds are fixed at construction; only `soc_kwh` changes between steps.
#[derive(Debug, Clone)]
pub struct DispatchState {
    soc_kwh: f64,
    min_soc_kwh: f64,
    max_soc_kwh: f64,
    efficiency_charge: f64,
    efficiency_discharge: f64,
    max_charge_step_kwh: f64,
    max_discharge_step_kwh: f64,
}

impl DispatchState {
    /// Derives the dispatch state for `sim_year` with steps of `interval_hours`.
    pub fn new(battery: &BatteryConfig, interval_hours: f64, sim_year: u32) -> Self {
        let capacity = battery.aged_capacity_kwh(sim_year);
        let min_soc_kwh = battery.min_soc_pct / 100.0 * capacity;
        let max_soc_kwh = battery.max_soc_pct / 100.0 * capacity;
        let initial = battery.initial_soc_pct / 100.0 * capacity;
        Self {
            soc_kwh: initial.clamp(min_soc_kwh, max_soc_kwh),
            min_soc_kwh,
            max_soc_kwh,
            efficiency_charge: battery.efficiency_charge,
            efficiency_discharge: battery.efficiency_discharge,
            max_charge_step_kwh: battery.max_charge_kw * interval_hours,
            max_discharge_step_kwh: battery.max_discharge_kw * interval_hours,
        }
    }

    pub fn soc_kwh(&self) -> f64 {
        self.soc_kwh
    }

    pub fn min_soc_kwh(&self) -> f64 {
        self.min_soc_kwh
    }

    pub fn max_soc_kwh(&self) -> f64 {
        self.max_soc_kwh
    }

    /// Dispatches one interval and advances the SOC.
    ///
    /// Order: direct use, charge from surplus, discharge to deficit, then
    /// grid export and import for whatever is left.
    pub fn dispatch(&mut self, generation_kwh: f64, consumption_kwh: f64) -> FlowRecord {
        let direct = generation_kwh.min(consumption_kwh);
        let mut remaining_gen = generation_kwh - direct;
        let mut remaining_cons = consumption_kwh - direct;

        let mut record = FlowRecord {
            generation_kwh,
            consumption_kwh,
            direct_self_consumption_kwh: direct,
            ..FlowRecord::default()
        };

        if remaining_gen > 0.0 {
            let headroom = (self.max_soc_kwh - self.soc_kwh).min(self.max_charge_step_kwh);
            let gross = remaining_gen.min(headroom).max(0.0);
            let stored = gross * self.efficiency_charge;
            self.soc_kwh += stored;
            record.battery_charge_kwh = gross;
            record.charge_losses_kwh = gross - stored;
            remaining_gen -= gross;
        }

        if remaining_cons > 0.0 {
            // Delivered energy is capped after losses; the SOC draw is its inverse.
            let available = (self.soc_kwh - self.min_soc_kwh)
                .min(self.max_discharge_step_kwh)
                .max(0.0);
            let delivered = (available * self.efficiency_discharge).min(remaining_cons);
            let gross = delivered / self.efficiency_discharge;
            self.soc_kwh -= gross;
            record.battery_discharge_kwh = delivered;
            record.discharge_losses_kwh = gross - delivered;
            remaining_cons -= delivered;
        }

        if remaining_gen > 0.0 {
            record.grid_export_kwh = remaining_gen;
        }
        if remaining_cons > 0.0 {
            record.grid_import_kwh = remaining_cons;
        }

        self.soc_kwh = self.soc_kwh.clamp(self.min_soc_kwh, self.max_soc_kwh);
        record.soc_kwh = self.soc_kwh;
        record
    }
}

/// Steps a [`DispatchState`] across a profile.
pub struct Engine<'a> {
    profile: &'a Profile,
    state: DispatchState,
}

impl<'a> Engine<'a> {
    pub fn new(profile: &'a Profile, battery: &BatteryConfig, sim_year: u32) -> Self {
        Self {
            profile,
            state: DispatchState::new(battery, profile.interval_hours(), sim_year),
        }
    }

    /// Executes interval `i` of the profile.
    pub fn step(&mut self, i: usize) -> FlowRecord {
        self.state
            .dispatch(self.profile.generation()[i], self.profile.consumption()[i])
    }

    /// Executes every interval in order.
    pub fn run(&mut self) -> Vec<FlowRecord> {
        let mut records = Vec::with_capacity(self.profile.len());
        for i in 0..self.profile.len() {
            records.push(self.step(i));
        }
        records
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }
}

/// Run-level facts that are not flows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationMetadata {
    pub resolution: &'static str,
    pub interval_hours: f64,
    pub periods: usize,
    pub max_charge_kw: f64,
    pub max_discharge_kw: f64,
}

/// Flow table plus aggregates of one simulation call.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    records: Vec<FlowRecord>,
    kpis: SimulationKpis,
    metadata: SimulationMetadata,
}

impl SimulationResult {
    pub fn records(&self) -> &[FlowRecord] {
        &self.records
    }

    pub fn kpis(&self) -> &SimulationKpis {
        &self.kpis
    }

    pub fn metadata(&self) -> &SimulationMetadata {
        &self.metadata
    }
}

/// Simulates one year of dispatch.
///
/// Prices are applied per step to the import cost and export revenue.
///
/// # Errors
///
/// Fails when the battery parameters are invalid, a price series does not
/// match the profile length, or `sim_year` is zero.
pub fn simulate(
    profile: &Profile,
    battery: &BatteryConfig,
    tariff: &Tariff,
    sim_year: u32,
) -> Result<SimulationResult> {
    battery.validate()?;
    tariff.check(profile.len())?;
    if sim_year == 0 {
        return Err(SizingError::InvalidParameter {
            field: "sim_year",
            value: 0.0,
            constraint: "must be >= 1",
        });
    }

    let records = Engine::new(profile, battery, sim_year).run();
    let kpis = SimulationKpis::from_records(&records, battery, tariff, sim_year);
    let resolution = profile.resolution();
    let metadata = SimulationMetadata {
        resolution: resolution.tag(),
        interval_hours: resolution.interval_hours(),
        periods: records.len(),
        max_charge_kw: battery.max_charge_kw,
        max_discharge_kw: battery.max_discharge_kw,
    };

    debug!(
        capacity_kwh = battery.capacity_kwh,
        sim_year,
        resolution = metadata.resolution,
        grid_import_kwh = kpis.total_grid_import_kwh,
        grid_export_kwh = kpis.total_grid_export_kwh,
        "simulation finished"
    );

    Ok(SimulationResult {
        records,
        kpis,
        metadata,
    })
}

/// Simulates simulation years `1..=years` on the same profile.
///
/// # Errors
///
/// Propagates the first failing [`simulate`] call.
pub fn simulate_years(
    profile: &Profile,
    battery: &BatteryConfig,
    tariff: &Tariff,
    years: u32,
) -> Result<Vec<SimulationResult>> {
    (1..=years)
        .map(|year| simulate(profile, battery, tariff, year))
        .collect()
}
