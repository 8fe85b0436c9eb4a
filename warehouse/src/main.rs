use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use common::config::Settings;
use common::telemetry::init_tracing;
use std::process;

const DEFAULT_CONFIG: &str = "config/warehouse.toml";

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Sets a custom config file")
}

fn load_settings(matches: &ArgMatches) -> anyhow::Result<Settings> {
    let config_path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_CONFIG);

    let settings = Settings::new(config_path)
        .with_context(|| format!("failed to load config from {}", config_path))?;
    init_tracing(&settings.logging).context("failed to initialise logging")?;

    Ok(settings)
}

async fn rebuild(matches: &ArgMatches) -> anyhow::Result<()> {
    let settings = load_settings(matches)?;
    let summary = warehouse::run_rebuild(&settings).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn serve(matches: &ArgMatches) -> anyhow::Result<()> {
    let settings = load_settings(matches)?;
    warehouse::run_server(&settings).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = Command::new("Food Delivery Warehouse")
        .version("1.0")
        .about("Builds the order star schema and serves its reports")
        .subcommand(
            Command::new("rebuild")
                .about("Rebuild the warehouse once and print the summary")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("serve")
                .about("Rebuild the warehouse, then serve the report API")
                .arg(config_arg()),
        )
        .get_matches();

    let outcome = match matches.subcommand() {
        Some(("rebuild", sub_matches)) => rebuild(sub_matches).await,
        Some(("serve", sub_matches)) => serve(sub_matches).await,
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("warehouse error: {:#}", e);
        process::exit(1);
    }
}
