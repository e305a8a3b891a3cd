use clap::Parser;
use tracing_subscriber::EnvFilter;

use twin2multicloud::cli::{CliArgs, Command, ProjectRegistry};
use twin2multicloud::optimizer::{self, OptimizeParams, PricingSnapshot};
use twin2multicloud::Orchestrator;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = CliArgs::parse();
    let exit_code = run(cli).await;
    std::process::exit(exit_code);
}

async fn run(cli: CliArgs) -> i32 {
    let project_path = match resolve_project_path(&cli) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("error: {err}");
            return 2;
        }
    };

    match cli.command {
        Command::Deploy => match Orchestrator::new(project_path.clone()) {
            Ok(orchestrator) => match orchestrator.deploy(&project_name(&project_path)).await {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                        "completed_layers": outcome.completed_layers,
                        "failed_layer": outcome.failed_layer,
                    })).unwrap());
                    if outcome.failed_layer.is_some() { 3 } else { 0 }
                }
                Err(err) => report(&err),
            },
            Err(err) => report(&err),
        },
        Command::Destroy { dry_run } => match Orchestrator::new(project_path.clone()) {
            Ok(orchestrator) => match orchestrator.destroy(&project_name(&project_path), dry_run).await {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                        "completed_layers": outcome.completed_layers,
                        "failed_layer": outcome.failed_layer,
                    })).unwrap());
                    if outcome.failed_layer.is_some() { 4 } else { 0 }
                }
                Err(err) => report(&err),
            },
            Err(err) => report(&err),
        },
        Command::Check => match Orchestrator::new(project_path.clone()) {
            Ok(orchestrator) => match orchestrator.info(&project_name(&project_path)).await {
                Ok(report_map) => {
                    println!("{}", serde_json::to_string_pretty(&report_map).unwrap());
                    0
                }
                Err(err) => report(&err),
            },
            Err(err) => report(&err),
        },
        Command::Optimize { pricing_file, currency } => run_optimize(&project_path, &pricing_file, &currency),
        Command::ListProjects => match ProjectRegistry::load() {
            Ok(registry) => {
                for entry in registry.list() {
                    println!("{}\t{}", entry.name, entry.path.display());
                }
                0
            }
            Err(err) => report(&err),
        },
        Command::CreateProject { name, path } => match ProjectRegistry::load() {
            Ok(mut registry) => match registry.create(&name, &path) {
                Ok(()) => {
                    println!("created project '{name}' at {}", path.display());
                    0
                }
                Err(err) => report(&err),
            },
            Err(err) => report(&err),
        },
        Command::SetProject { name } => match ProjectRegistry::load() {
            Ok(mut registry) => match registry.set_active(&name) {
                Ok(()) => {
                    println!("active project is now '{name}'");
                    0
                }
                Err(err) => report(&err),
            },
            Err(err) => report(&err),
        },
    }
}

fn resolve_project_path(cli: &CliArgs) -> Result<std::path::PathBuf, twin2multicloud::DeployerError> {
    if let Some(path) = &cli.project_path {
        return Ok(path.clone());
    }
    match &cli.command {
        Command::ListProjects | Command::CreateProject { .. } | Command::SetProject { .. } => Ok(std::path::PathBuf::new()),
        _ => ProjectRegistry::load()?.active_path(),
    }
}

fn project_name(path: &std::path::Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "twin".to_string())
}

fn report(err: &twin2multicloud::DeployerError) -> i32 {
    eprintln!("error: {err}");
    err.exit_code()
}

fn run_optimize(project_path: &std::path::Path, pricing_file: &std::path::Path, currency: &str) -> i32 {
    let config = match twin2multicloud::config::TwinConfig::load(project_path) {
        Ok(config) => config,
        Err(err) => return report(&err),
    };

    let raw = match std::fs::read_to_string(pricing_file) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("error: failed to read pricing file: {err}");
            return 2;
        }
    };
    let pricing: PricingSnapshot = match serde_json::from_str(&raw) {
        Ok(pricing) => pricing,
        Err(err) => {
            eprintln!("error: invalid pricing snapshot: {err}");
            return 2;
        }
    };

    let total_devices = config.iot_devices.len() as u32;
    let params = OptimizeParams {
        number_of_devices: total_devices.max(1),
        device_sending_interval_minutes: 5.0,
        average_message_size_kb: 1.0,
        hot_storage_duration_months: config.hot_storage_days as f64 / 30.0,
        cool_storage_duration_months: config.cold_storage_days as f64 / 30.0,
        archive_storage_duration_months: config.archive_storage_days as f64 / 30.0,
        entity_count: config.iot_devices.len() as u32,
        dashboard_refreshes_per_hour: 4.0,
        dashboard_active_hours_per_day: 8.0,
        amount_of_active_editors: 2,
        amount_of_active_viewers: 5,
        optimization: config.optimization,
        currency: currency.to_string(),
    };

    match optimizer::calculate_cheapest_costs(&params, &pricing) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result).unwrap());
            0
        }
        Err(err) => {
            eprintln!("error: {err}");
            5
        }
    }
}
