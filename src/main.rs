//! bess-sizer entry point: CLI wiring around simulation and capacity sweep.

use std::path::Path;
use std::process;

use serde::Serialize;
use tracing::info;

use bess_sizer::catalog::PowerTable;
use bess_sizer::config::ScenarioConfig;
use bess_sizer::error::Result;
use bess_sizer::io::export::{export_candidates, export_csv};
use bess_sizer::io::import::{load_cost_curve, load_power_table, load_profile};
use bess_sizer::optimizer::{self, CapacityOptimizer, OptimizationCandidate};
use bess_sizer::sim::balance::{self, BalanceReport};
use bess_sizer::sim::engine::simulate;
use bess_sizer::sim::kpi::SimulationKpis;
use bess_sizer::sim::types::{Profile, Tariff};
use bess_sizer::telemetry::init_tracing;

/// Parsed CLI arguments.
#[derive(Default)]
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    profile_path: Option<String>,
    cost_curve_path: Option<String>,
    power_table_path: Option<String>,
    telemetry_out: Option<String>,
    results_out: Option<String>,
    json: bool,
}

/// Everything `--json` prints.
#[derive(Serialize)]
struct Report<'a> {
    simulation: &'a SimulationKpis,
    balance: &'a BalanceReport,
    best: Option<&'a OptimizationCandidate>,
    candidates: &'a [OptimizationCandidate],
}

fn print_help() {
    eprintln!("bess-sizer: battery storage sizing for a household load and PV profile");
    eprintln!();
    eprintln!("Usage: bess-sizer [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!(
        "  --profile <path>         Profile CSV \
         (generation_kwh,consumption_kwh[,grid_price,feed_in_price])"
    );
    eprintln!("  --cost-curve <path>      Cost curve CSV (capacity_kwh,total_cost_eur)");
    eprintln!(
        "  --power-table <path>     Power table CSV \
         (capacity_kwh,max_charge_kw,max_discharge_kw[,c_rate])"
    );
    eprintln!("  --telemetry-out <path>   Export the configured battery's flow table to CSV");
    eprintln!("  --results-out <path>     Export the capacity sweep to CSV");
    eprintln!("  --json                   Print KPIs and sweep results as JSON");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Without --profile a synthetic year is generated from the [profile] section;");
    eprintln!("without --cost-curve the linear [cost] demo curve is used.");
}

/// Value of an option that takes one argument, or exits with a message.
fn option_value(args: &[String], i: &mut usize, flag: &str, what: &str) -> String {
    *i += 1;
    if *i >= args.len() {
        eprintln!("error: {flag} requires a {what} argument");
        process::exit(1);
    }
    args[*i].clone()
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                cli.scenario_path = Some(option_value(&args, &mut i, "--scenario", "path"));
            }
            "--preset" => cli.preset = Some(option_value(&args, &mut i, "--preset", "name")),
            "--profile" => {
                cli.profile_path = Some(option_value(&args, &mut i, "--profile", "path"));
            }
            "--cost-curve" => {
                cli.cost_curve_path = Some(option_value(&args, &mut i, "--cost-curve", "path"));
            }
            "--power-table" => {
                cli.power_table_path = Some(option_value(&args, &mut i, "--power-table", "path"));
            }
            "--telemetry-out" => {
                cli.telemetry_out = Some(option_value(&args, &mut i, "--telemetry-out", "path"));
            }
            "--results-out" => {
                cli.results_out = Some(option_value(&args, &mut i, "--results-out", "path"));
            }
            "--json" => cli.json = true,
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Loads the scenario: `--scenario` takes priority, then `--preset`, then baseline.
fn load_scenario(cli: &CliArgs) -> ScenarioConfig {
    let loaded = if let Some(ref path) = cli.scenario_path {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    scenario
}

/// Profile and tariff, from CSV when given, else the synthetic year.
fn load_inputs(cli: &CliArgs, scenario: &ScenarioConfig) -> Result<(Profile, Tariff)> {
    match cli.profile_path {
        Some(ref path) => {
            let imported = load_profile(Path::new(path))?;
            let tariff = imported.tariff(&scenario.tariff);
            Ok((imported.profile, tariff))
        }
        None => {
            let profile = scenario.profile.generate()?;
            info!(
                resolution = %profile.resolution(),
                seed = scenario.profile.seed,
                "synthetic profile generated"
            );
            Ok((profile, scenario.tariff.clone()))
        }
    }
}

fn print_candidates(candidates: &[OptimizationCandidate], best: Option<&OptimizationCandidate>) {
    println!("--- Capacity sweep ---");
    println!(
        "{:>8} {:>8} {:>8} {:>10} {:>10} {:>8} {:>8} {:>10} {:>10}",
        "kWh", "autarky", "self-c.", "invest", "NPV", "IRR %", "payback", "DB III", "DB III PV"
    );
    for c in candidates {
        let marker = if best.is_some_and(|b| std::ptr::eq(b, c)) {
            " *"
        } else {
            ""
        };
        println!(
            "{:>8.1} {:>7.1}% {:>7.1}% {:>10.0} {:>10.0} {:>8.2} {:>8.2} {:>10.0} {:>10.0}\
             {marker}",
            c.capacity_kwh,
            c.simulation.autarky_rate * 100.0,
            c.simulation.self_consumption_rate * 100.0,
            c.financial.investment_cost,
            c.financial.npv,
            c.financial.irr_pct,
            c.financial.payback_period_years,
            c.margin.db3,
            c.margin.total_db3_present_value,
        );
    }
}

fn run(cli: &CliArgs, scenario: &ScenarioConfig) -> Result<()> {
    let (profile, tariff) = load_inputs(cli, scenario)?;
    let cost_curve = match cli.cost_curve_path {
        Some(ref path) => load_cost_curve(Path::new(path))?,
        None => scenario.cost.curve(),
    };
    let power_table: Option<PowerTable> = match cli.power_table_path {
        Some(ref path) => Some(load_power_table(Path::new(path))?),
        None => None,
    };

    // Configured battery
    let sim = simulate(&profile, &scenario.battery, &tariff, 1)?;
    let report = balance::validate(
        &sim,
        scenario.battery.efficiency_charge,
        scenario.battery.efficiency_discharge,
        scenario.validation.tolerance_pct,
    );

    if let Some(ref path) = cli.telemetry_out {
        export_csv(sim.records(), sim.metadata().interval_hours, Path::new(path))?;
        eprintln!("Telemetry written to {path}");
    }

    // Capacity sweep
    let mut sweep = CapacityOptimizer::new(
        &profile,
        &scenario.battery,
        &tariff,
        &cost_curve,
        &scenario.finance,
    )
    .with_tolerance(scenario.validation.tolerance_pct);
    if let Some(ref table) = power_table {
        sweep = sweep.with_power_table(table);
    }
    let candidates = sweep.run(&scenario.sweep)?;
    let best = optimizer::best(&candidates, scenario.sweep.criterion);

    if let Some(ref path) = cli.results_out {
        export_candidates(&candidates, Path::new(path))?;
        eprintln!("Sweep results written to {path}");
    }

    if cli.json {
        let out = Report {
            simulation: sim.kpis(),
            balance: &report,
            best,
            candidates: &candidates,
        };
        match serde_json::to_string_pretty(&out) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to serialize report: {e}");
                process::exit(1);
            }
        }
        return Ok(());
    }

    println!("{}", sim.kpis());
    println!(
        "Energy balance:        {}",
        if report.all_ok() { "ok" } else { "FAILED" }
    );
    println!();
    print_candidates(&candidates, best);
    if let Some(b) = best {
        println!(
            "\nBest capacity by {:?}: {:.1} kWh (NPV {:.0}, DB III PV {:.0})",
            scenario.sweep.criterion,
            b.capacity_kwh,
            b.financial.npv,
            b.margin.total_db3_present_value
        );
    }
    Ok(())
}

fn main() {
    init_tracing();
    let cli = parse_args();
    let scenario = load_scenario(&cli);

    if let Err(e) = run(&cli, &scenario) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
