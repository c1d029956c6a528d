//! Aggregate KPIs computed post-hoc from a flow table.

use std::fmt;

use serde::Serialize;

use super::types::{BatteryConfig, FlowRecord, Tariff};

/// Flat KPI dictionary of one simulation run.
///
/// Serializes as a single JSON object for the reporting layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationKpis {
    /// Share of consumption not drawn from the grid (0..=1).
    pub autarky_rate: f64,
    /// Share of generation used on site, directly or through the battery (0..=1).
    pub self_consumption_rate: f64,
    pub total_generation_kwh: f64,
    pub total_consumption_kwh: f64,
    pub total_direct_self_consumption_kwh: f64,
    pub total_battery_charge_kwh: f64,
    pub total_battery_discharge_kwh: f64,
    pub total_charge_losses_kwh: f64,
    pub total_discharge_losses_kwh: f64,
    pub total_grid_import_kwh: f64,
    pub total_grid_export_kwh: f64,
    pub grid_import_cost: f64,
    pub grid_export_revenue: f64,
    /// Import cost minus export revenue.
    pub effective_annual_energy_cost: f64,
    pub efficiency_charge: f64,
    pub efficiency_discharge: f64,
    pub original_capacity_kwh: f64,
    pub current_capacity_kwh: f64,
    pub capacity_loss_pct: f64,
    pub simulation_year: u32,
}

impl SimulationKpis {
    /// Sums every flow column and derives the rates and costs.
    pub fn from_records(
        records: &[FlowRecord],
        battery: &BatteryConfig,
        tariff: &Tariff,
        sim_year: u32,
    ) -> Self {
        let sum = |f: fn(&FlowRecord) -> f64| records.iter().map(f).sum::<f64>();
        let generation = sum(|r| r.generation_kwh);
        let consumption = sum(|r| r.consumption_kwh);
        let direct = sum(|r| r.direct_self_consumption_kwh);
        let discharge = sum(|r| r.battery_discharge_kwh);
        let import = sum(|r| r.grid_import_kwh);
        let export = sum(|r| r.grid_export_kwh);

        let grid_import_cost = tariff.grid.cost_of(records.iter().map(|r| r.grid_import_kwh));
        let grid_export_revenue = tariff
            .feed_in
            .cost_of(records.iter().map(|r| r.grid_export_kwh));

        let original = battery.capacity_kwh;
        let current = battery.aged_capacity_kwh(sim_year);
        let capacity_loss_pct = if original > 0.0 {
            (original - current) / original * 100.0
        } else {
            0.0
        };

        Self {
            autarky_rate: if consumption > 0.0 {
                (consumption - import) / consumption
            } else {
                0.0
            },
            self_consumption_rate: if generation > 0.0 {
                (direct + discharge) / generation
            } else {
                0.0
            },
            total_generation_kwh: generation,
            total_consumption_kwh: consumption,
            total_direct_self_consumption_kwh: direct,
            total_battery_charge_kwh: sum(|r| r.battery_charge_kwh),
            total_battery_discharge_kwh: discharge,
            total_charge_losses_kwh: sum(|r| r.charge_losses_kwh),
            total_discharge_losses_kwh: sum(|r| r.discharge_losses_kwh),
            total_grid_import_kwh: import,
            total_grid_export_kwh: export,
            grid_import_cost,
            grid_export_revenue,
            effective_annual_energy_cost: grid_import_cost - grid_export_revenue,
            efficiency_charge: battery.efficiency_charge,
            efficiency_discharge: battery.efficiency_discharge,
            original_capacity_kwh: original,
            current_capacity_kwh: current,
            capacity_loss_pct,
            simulation_year: sim_year,
        }
    }
}

impl fmt::Display for SimulationKpis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Simulation KPIs (year {}) ---", self.simulation_year)?;
        writeln!(f, "Autarky rate:          {:.1}%", self.autarky_rate * 100.0)?;
        writeln!(
            f,
            "Self-consumption rate: {:.1}%",
            self.self_consumption_rate * 100.0
        )?;
        writeln!(f, "Generation:            {:.2} kWh", self.total_generation_kwh)?;
        writeln!(f, "Consumption:           {:.2} kWh", self.total_consumption_kwh)?;
        writeln!(f, "Grid import:           {:.2} kWh", self.total_grid_import_kwh)?;
        writeln!(f, "Grid export:           {:.2} kWh", self.total_grid_export_kwh)?;
        writeln!(
            f,
            "Battery charge/disch.: {:.2} / {:.2} kWh (losses {:.2} / {:.2})",
            self.total_battery_charge_kwh,
            self.total_battery_discharge_kwh,
            self.total_charge_losses_kwh,
            self.total_discharge_losses_kwh
        )?;
        writeln!(
            f,
            "Capacity:              {:.2} of {:.2} kWh ({:.2}% loss)",
            self.current_capacity_kwh, self.original_capacity_kwh, self.capacity_loss_pct
        )?;
        write!(
            f,
            "Annual energy cost:    {:.2} (import {:.2}, export {:.2})",
            self.effective_annual_energy_cost, self.grid_import_cost, self.grid_export_revenue
        )
    }
}
