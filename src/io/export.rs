//! CSV export for flow tables and sweep candidates.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::optimizer::OptimizationCandidate;
use crate::sim::types::FlowRecord;

/// Column header of the per-interval flow table.
const FLOW_HEADER: &str = "timestep,time_hr,generation_kwh,consumption_kwh,\
                           direct_self_consumption_kwh,battery_charge_kwh,\
                           battery_discharge_kwh,charge_losses_kwh,discharge_losses_kwh,\
                           grid_import_kwh,grid_export_kwh,soc_kwh";

/// Column header of the sweep table.
const CANDIDATE_HEADER: &str = "capacity_kwh,max_charge_kw,max_discharge_kw,autarky_rate,\
                                self_consumption_rate,grid_import_kwh,grid_export_kwh,\
                                battery_losses_kwh,investment_cost,annual_savings,npv,irr_pct,\
                                payback_years,db3,total_db3_nominal,total_db3_present_value,\
                                roi_pct,balance_ok";

/// Exports a flow table to a CSV file at the given path.
///
/// `interval_hours` converts the step index into the `time_hr` column.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[FlowRecord], interval_hours: f64, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(records, interval_hours, buf)
}

/// Writes a flow table as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(
    records: &[FlowRecord],
    interval_hours: f64,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(FLOW_HEADER.split(',').map(str::trim))?;

    for (t, r) in records.iter().enumerate() {
        wtr.write_record(&[
            t.to_string(),
            format!("{:.4}", t as f64 * interval_hours),
            format!("{:.6}", r.generation_kwh),
            format!("{:.6}", r.consumption_kwh),
            format!("{:.6}", r.direct_self_consumption_kwh),
            format!("{:.6}", r.battery_charge_kwh),
            format!("{:.6}", r.battery_discharge_kwh),
            format!("{:.6}", r.charge_losses_kwh),
            format!("{:.6}", r.discharge_losses_kwh),
            format!("{:.6}", r.grid_import_kwh),
            format!("{:.6}", r.grid_export_kwh),
            format!("{:.6}", r.soc_kwh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports the sweep results to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_candidates(candidates: &[OptimizationCandidate], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_candidates(candidates, io::BufWriter::new(file))
}

/// Writes one row per candidate in sweep order.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_candidates(
    candidates: &[OptimizationCandidate],
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(CANDIDATE_HEADER.split(',').map(str::trim))?;

    for c in candidates {
        let s = &c.simulation;
        let f = &c.financial;
        let m = &c.margin;
        wtr.write_record(&[
            format!("{:.2}", c.capacity_kwh),
            format!("{:.2}", c.max_charge_kw),
            format!("{:.2}", c.max_discharge_kw),
            format!("{:.6}", s.autarky_rate),
            format!("{:.6}", s.self_consumption_rate),
            format!("{:.3}", s.total_grid_import_kwh),
            format!("{:.3}", s.total_grid_export_kwh),
            format!("{:.3}", c.battery_losses_kwh()),
            format!("{:.2}", f.investment_cost),
            format!("{:.2}", f.annual_savings),
            format!("{:.2}", f.npv),
            format!("{:.4}", f.irr_pct),
            format!("{:.3}", f.payback_period_years),
            format!("{:.2}", m.db3),
            format!("{:.2}", m.total_db3_nominal),
            format!("{:.2}", m.total_db3_present_value),
            format!("{:.4}", m.roi_pct),
            c.balance.all_ok().to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
