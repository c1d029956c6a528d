//! Integration tests for the capacity sweep.

mod common;

use bess_sizer::SizingError;
use bess_sizer::catalog::{CostCurve, PowerTable};
use bess_sizer::finance::{FinanceParams, ReferenceScenario};
use bess_sizer::io::export::write_candidates;
use bess_sizer::optimizer::{CapacityOptimizer, Criterion, SweepRange, best};
use bess_sizer::sim::types::{BatteryConfig, Tariff};

fn sweep(range: &SweepRange) -> Vec<bess_sizer::optimizer::OptimizationCandidate> {
    let profile = common::day_night_profile();
    let battery = BatteryConfig::default();
    let tariff = Tariff::default();
    let curve = common::demo_curve();
    let params = FinanceParams::default();
    CapacityOptimizer::new(&profile, &battery, &tariff, &curve, &params)
        .run(range)
        .expect("sweep runs")
}

#[test]
fn candidates_follow_sweep_order() {
    let candidates = sweep(&SweepRange::new(0.0, 12.0, 4.0));
    let capacities: Vec<f64> = candidates.iter().map(|c| c.capacity_kwh).collect();
    assert_eq!(capacities, vec![0.0, 4.0, 8.0, 12.0]);
    assert!(candidates.iter().all(|c| c.balance.all_ok()));
}

#[test]
fn zero_capacity_candidate_is_the_reference() {
    let candidates = sweep(&SweepRange::new(0.0, 10.0, 5.0));
    let zero = &candidates[0];
    let reference = ReferenceScenario::simulate(&common::day_night_profile(), &Tariff::default())
        .expect("runs");

    assert_eq!(zero.simulation.total_grid_import_kwh, reference.grid_import_kwh);
    assert_eq!(zero.simulation.total_grid_export_kwh, reference.grid_export_kwh);
    assert_eq!(zero.financial.npv, 0.0);
    assert!(zero.financial.irr_pct.is_nan());
    assert_eq!(zero.margin.total_db3_nominal, 0.0);
    assert_eq!(zero.battery_losses_kwh(), 0.0);
}

#[test]
fn larger_batteries_import_less() {
    let candidates = sweep(&SweepRange::new(0.0, 10.0, 5.0));
    assert!(
        candidates[1].simulation.total_grid_import_kwh
            < candidates[0].simulation.total_grid_import_kwh
    );
    assert!(candidates[1].financial.reduced_grid_import_kwh > 0.0);
    assert!(candidates[1].self_consumption_kwh() > candidates[0].self_consumption_kwh());
}

#[test]
fn best_picks_first_of_equal_scores() {
    let mut candidates = sweep(&SweepRange::new(0.0, 10.0, 5.0));
    for c in &mut candidates {
        c.margin.total_db3_present_value = 100.0;
    }
    let winner = best(&candidates, Criterion::Db3PresentValue).expect("non-empty");
    assert_eq!(winner.capacity_kwh, 0.0);

    candidates[2].margin.total_db3_present_value = 150.0;
    candidates[0].margin.total_db3_present_value = f64::NAN;
    let winner = best(&candidates, Criterion::Db3PresentValue).expect("non-empty");
    assert_eq!(winner.capacity_kwh, 10.0);

    assert!(best(&[], Criterion::Npv).is_none());
}

#[test]
fn best_by_npv_matches_manual_maximum() {
    let candidates = sweep(&SweepRange::new(1.0, 9.0, 2.0));
    let winner = best(&candidates, Criterion::Npv).expect("non-empty");
    let max = candidates
        .iter()
        .map(|c| c.financial.npv)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(winner.financial.npv, max);
}

#[test]
fn power_table_sets_per_capacity_rating() {
    let profile = common::day_night_profile();
    let battery = BatteryConfig::default();
    let tariff = Tariff::default();
    let curve = common::demo_curve();
    let params = FinanceParams::default();
    let table = PowerTable::from_csv_reader(
        "capacity_kwh,max_charge_kw,max_discharge_kw,c_rate\n4,2.0,3.0,\n8,,,0.5\n".as_bytes(),
    )
    .expect("valid csv");

    let candidates = CapacityOptimizer::new(&profile, &battery, &tariff, &curve, &params)
        .with_power_table(&table)
        .run(&SweepRange::new(0.0, 8.0, 4.0))
        .expect("sweep runs");

    // zero capacity keeps the configured rating
    assert_eq!(candidates[0].max_charge_kw, battery.max_charge_kw);
    assert_eq!(candidates[1].max_charge_kw, 2.0);
    assert_eq!(candidates[1].max_discharge_kw, 3.0);
    assert_eq!(candidates[2].max_charge_kw, 4.0);
    assert_eq!(candidates[2].max_discharge_kw, 4.0);
}

#[test]
fn sweep_beyond_catalogue_fails() {
    let profile = common::flat_profile(0.5, 0.5);
    let battery = BatteryConfig::default();
    let tariff = Tariff::default();
    let curve = common::demo_curve();
    let params = FinanceParams::default();
    let err = CapacityOptimizer::new(&profile, &battery, &tariff, &curve, &params)
        .run(&SweepRange::new(200.0, 250.0, 50.0))
        .expect_err("must fail");
    assert!(matches!(err, SizingError::CapacityOutOfRange { capacity: 250 }));

    let sparse = CostCurve::from_entries([(5.0, 2000.0)]);
    let err = CapacityOptimizer::new(&profile, &battery, &tariff, &sparse, &params)
        .run(&SweepRange::new(0.0, 10.0, 5.0))
        .expect_err("must fail");
    assert!(matches!(err, SizingError::MissingCostEntry { capacity: 10 }));
}

#[test]
fn invalid_range_is_rejected() {
    let profile = common::flat_profile(0.5, 0.5);
    let battery = BatteryConfig::default();
    let tariff = Tariff::default();
    let curve = common::demo_curve();
    let params = FinanceParams::default();
    let err = CapacityOptimizer::new(&profile, &battery, &tariff, &curve, &params)
        .run(&SweepRange::new(0.0, 10.0, -1.0))
        .expect_err("must fail");
    assert!(matches!(
        err,
        SizingError::InvalidParameter {
            field: "step_kwh",
            ..
        }
    ));
}

#[test]
fn candidates_export_one_row_each() {
    let candidates = sweep(&SweepRange::new(0.0, 6.0, 2.0));
    let mut buf = Vec::new();
    write_candidates(&candidates, &mut buf).expect("writes");
    let output = String::from_utf8(buf).expect("utf-8");
    assert_eq!(output.lines().count(), candidates.len() + 1);
    assert!(output.lines().nth(1).is_some_and(|l| l.starts_with("0.00,")));
}
