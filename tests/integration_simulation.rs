//! Integration tests for dispatch, KPIs and balance checks over full years.

mod common;

use bess_sizer::SizingError;
use bess_sizer::sim::balance;
use bess_sizer::sim::engine::{simulate, simulate_years};
use bess_sizer::sim::types::{BatteryConfig, PriceSignal, Profile, Tariff};

#[test]
fn no_generation_no_battery_imports_everything() {
    let profile = common::flat_profile(0.0, 1.0);
    let result = simulate(&profile, &BatteryConfig::disabled(), &Tariff::default(), 1)
        .expect("simulation runs");
    let kpis = result.kpis();

    assert_eq!(result.records().len(), common::HOURS);
    assert_eq!(kpis.autarky_rate, 0.0);
    assert!((kpis.total_grid_import_kwh - 8760.0).abs() < 1e-9);
    assert_eq!(kpis.total_grid_export_kwh, 0.0);
    assert!((kpis.grid_import_cost - 8760.0 * 0.30).abs() < 1e-6);
    assert_eq!(result.metadata().resolution, "hourly");

    let report = balance::validate(&result, 1.0, 1.0, balance::DEFAULT_TOLERANCE_PCT);
    assert!(report.all_ok(), "balance should hold: {report:?}");
}

#[test]
fn first_step_surplus_charges_before_export() {
    let mut generation = vec![0.0; common::HOURS];
    let mut consumption = vec![0.0; common::HOURS];
    generation[0] = 5.0;
    consumption[0] = 2.0;
    let profile = Profile::new(generation, consumption).expect("valid profile");

    let result = simulate(&profile, &common::ideal_battery(100.0), &Tariff::default(), 1)
        .expect("simulation runs");
    let first = result.records()[0];
    assert!((first.direct_self_consumption_kwh - 2.0).abs() < 1e-12);
    assert!((first.battery_charge_kwh - 3.0).abs() < 1e-12);
    assert_eq!(first.grid_export_kwh, 0.0);
    assert_eq!(first.grid_import_kwh, 0.0);
    assert!((first.soc_kwh - 3.0).abs() < 1e-12);

    // Nothing happens afterwards; the stored energy stays put.
    let last = result.records()[common::HOURS - 1];
    assert!((last.soc_kwh - 3.0).abs() < 1e-12);
}

#[test]
fn per_step_power_limit_scales_with_interval() {
    let periods = 35040;
    let mut generation = vec![0.0; periods];
    generation[0] = 3.0;
    let profile = Profile::new(generation, vec![0.0; periods]).expect("valid profile");
    assert_eq!(profile.resolution().tag(), "15min");

    let battery = BatteryConfig {
        max_charge_kw: 4.0,
        ..common::ideal_battery(50.0)
    };
    let result = simulate(&profile, &battery, &Tariff::default(), 1).expect("simulation runs");
    let first = result.records()[0];
    // 4 kW for a quarter hour
    assert!((first.battery_charge_kwh - 1.0).abs() < 1e-12);
    assert!((first.grid_export_kwh - 2.0).abs() < 1e-12);
    assert_eq!(result.metadata().interval_hours, 0.25);
}

#[test]
fn zero_capacity_matches_disabled_battery() {
    let profile = common::day_night_profile();
    let tariff = Tariff::default();
    let zero = simulate(&profile, &common::default_battery(0.0), &tariff, 1).expect("runs");
    let disabled = simulate(&profile, &BatteryConfig::disabled(), &tariff, 1).expect("runs");

    assert_eq!(
        zero.kpis().total_grid_import_kwh,
        disabled.kpis().total_grid_import_kwh
    );
    assert_eq!(
        zero.kpis().total_grid_export_kwh,
        disabled.kpis().total_grid_export_kwh
    );
    assert_eq!(zero.kpis().total_battery_charge_kwh, 0.0);
    assert_eq!(zero.kpis().total_battery_discharge_kwh, 0.0);
}

#[test]
fn zero_capacity_routes_every_step_through_the_grid() {
    let profile = common::day_night_profile();
    let result =
        simulate(&profile, &common::default_battery(0.0), &Tariff::default(), 1).expect("runs");

    assert_eq!(result.records().len(), common::HOURS);
    for (t, r) in result.records().iter().enumerate() {
        let (g, c) = (r.generation_kwh, r.consumption_kwh);
        assert_eq!(r.battery_charge_kwh, 0.0, "charge at step {t}");
        assert_eq!(r.battery_discharge_kwh, 0.0, "discharge at step {t}");
        assert_eq!(r.soc_kwh, 0.0, "soc at step {t}");
        assert!((r.grid_import_kwh - (c - g).max(0.0)).abs() < 1e-12, "import at step {t}");
        assert!((r.grid_export_kwh - (g - c).max(0.0)).abs() < 1e-12, "export at step {t}");
    }
}

#[test]
fn battery_shifts_midday_surplus_to_evening() {
    let profile = common::day_night_profile();
    let tariff = Tariff::default();
    let without = simulate(&profile, &BatteryConfig::disabled(), &tariff, 1).expect("runs");
    let with = simulate(&profile, &common::default_battery(10.0), &tariff, 1).expect("runs");

    assert!(with.kpis().autarky_rate > without.kpis().autarky_rate);
    assert!(with.kpis().total_grid_import_kwh < without.kpis().total_grid_import_kwh);
    assert!(with.kpis().total_grid_export_kwh < without.kpis().total_grid_export_kwh);
    assert!(with.kpis().effective_annual_energy_cost < without.kpis().effective_annual_energy_cost);

    let battery = common::default_battery(10.0);
    let report = balance::validate(
        &with,
        battery.efficiency_charge,
        battery.efficiency_discharge,
        balance::DEFAULT_TOLERANCE_PCT,
    );
    assert!(report.all_ok(), "balance should hold: {report:?}");
}

#[test]
fn soc_stays_within_window_all_year() {
    let profile = common::synthetic_profile();
    let battery = common::default_battery(8.0);
    let result = simulate(&profile, &battery, &Tariff::default(), 1).expect("runs");
    for r in result.records() {
        assert!(r.soc_kwh >= 0.8 - 1e-9 && r.soc_kwh <= 7.2 + 1e-9, "SOC {r}");
    }
}

#[test]
fn degradation_shrinks_capacity_year_over_year() {
    let profile = common::synthetic_profile();
    let battery = BatteryConfig {
        annual_capacity_loss_pct: 2.0,
        ..common::default_battery(10.0)
    };
    let years = simulate_years(&profile, &battery, &Tariff::default(), 5).expect("runs");
    assert_eq!(years.len(), 5);
    assert_eq!(years[0].kpis().current_capacity_kwh, 10.0);
    assert_eq!(years[0].kpis().capacity_loss_pct, 0.0);
    for pair in years.windows(2) {
        assert!(pair[1].kpis().current_capacity_kwh < pair[0].kpis().current_capacity_kwh);
        assert!(pair[1].kpis().capacity_loss_pct > pair[0].kpis().capacity_loss_pct);
        assert_eq!(pair[1].kpis().simulation_year, pair[0].kpis().simulation_year + 1);
    }
    let expected = 10.0 * 0.98_f64.powi(4);
    assert!((years[4].kpis().current_capacity_kwh - expected).abs() < 1e-9);
}

#[test]
fn price_series_is_applied_per_step() {
    let profile = common::flat_profile(0.0, 1.0);
    let prices: Vec<f64> = (0..common::HOURS)
        .map(|h| if h % 2 == 0 { 0.2 } else { 0.4 })
        .collect();
    let tariff = Tariff {
        grid: PriceSignal::Series(prices),
        feed_in: PriceSignal::Flat(0.08),
    };
    let result = simulate(&profile, &BatteryConfig::disabled(), &tariff, 1).expect("runs");
    assert!((result.kpis().grid_import_cost - 4380.0 * 0.6).abs() < 1e-6);
}

#[test]
fn short_price_series_is_rejected() {
    let profile = common::flat_profile(0.0, 1.0);
    let tariff = Tariff {
        grid: PriceSignal::Series(vec![0.3; 10]),
        feed_in: PriceSignal::Flat(0.08),
    };
    let err = simulate(&profile, &BatteryConfig::disabled(), &tariff, 1).expect_err("must fail");
    assert!(matches!(
        err,
        SizingError::PriceLength {
            expected: 8760,
            actual: 10,
            ..
        }
    ));
}

#[test]
fn year_zero_is_rejected() {
    let profile = common::flat_profile(0.0, 1.0);
    let err = simulate(&profile, &BatteryConfig::disabled(), &Tariff::default(), 0)
        .expect_err("must fail");
    assert!(matches!(
        err,
        SizingError::InvalidParameter {
            field: "sim_year",
            ..
        }
    ));
}

#[test]
fn inverted_soc_window_is_rejected() {
    let profile = common::flat_profile(0.0, 1.0);
    let battery = BatteryConfig {
        min_soc_pct: 80.0,
        max_soc_pct: 20.0,
        ..BatteryConfig::default()
    };
    let err = simulate(&profile, &battery, &Tariff::default(), 1).expect_err("must fail");
    assert!(matches!(err, SizingError::InvalidSocWindow { .. }));
}
