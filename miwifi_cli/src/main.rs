use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;

use miwifi_cli::config::ConfigManager;
use miwifi_cli::simulation::{RoundOutcome, RoundSource, SimulationOptions, run_simulation};

#[derive(Parser)]
#[command(name = "miwifi-cache")]
#[command(author, version, about = "MiWiFi router data cache - fetch, cache and refresh router state", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Use this configuration file instead of the default location
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Run collection rounds against an in-process simulated router
    Simulate {
        /// Number of collection rounds
        #[arg(short, long)]
        rounds: Option<u32>,

        /// Pause between rounds in milliseconds
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,

        /// Latency of every simulated router call in milliseconds
        #[arg(long, value_name = "MS")]
        latency_ms: Option<u64>,

        /// Share of simulated calls that fail (0.0 - 1.0)
        #[arg(long, value_name = "RATE")]
        failure_rate: Option<f64>,

        /// Do not install the background refresher
        #[arg(long)]
        no_refresh: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the merged configuration as TOML
    Show,

    /// Print the configuration file path
    Path,

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., cache.ttl_secs)
        key: String,
    },

    /// Set a configuration value in the configuration file
    Set {
        /// Configuration key (e.g., fetcher.max_workers)
        key: String,
        /// New value
        value: String,
    },

    /// List all configuration values
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("miwifi_core", log::LevelFilter::Debug)
            .filter_module("miwifi_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let manager = ConfigManager::from_option(cli.config);

    match cli.command {
        Commands::Config { command } => config_command(manager, command),
        Commands::Simulate {
            rounds,
            interval_ms,
            latency_ms,
            failure_rate,
            no_refresh,
        } => {
            let config = manager.load().context("Failed to load configuration")?;
            let mut options = SimulationOptions::from_config(&config);
            if let Some(rounds) = rounds {
                options.rounds = rounds;
            }
            if let Some(ms) = interval_ms {
                options.interval = Duration::from_millis(ms);
            }
            if let Some(ms) = latency_ms {
                options.latency = Duration::from_millis(ms);
            }
            if let Some(rate) = failure_rate {
                options.failure_rate = rate;
            }
            options.background = !no_refresh;

            log::debug!("Simulation options: {options:?}");
            simulate_command(&config, &options).await
        }
    }
}

fn config_command(mut manager: ConfigManager, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            print!("{}", manager.show()?);
        }
        ConfigCommand::Path => {
            println!("{}", manager.get_config_path().display());
        }
        ConfigCommand::Get { key } => match manager.get(&key) {
            Ok(value) => {
                println!("{value}");
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::Set { key, value } => match manager.set(&key, &value) {
            Ok(()) => {
                eprintln!("{}", format!("Set {key} = {value}").green());
                eprintln!(
                    "Configuration saved to: {}",
                    manager.get_config_path().display()
                );
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {e:#}").red());
                std::process::exit(1);
            }
        },
        ConfigCommand::List => {
            let items = manager.list()?;
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());
            eprintln!();

            let mut current_section = "";
            for (key, value) in &items {
                let section = key.split('.').next().unwrap_or("general");
                if section != current_section {
                    if !current_section.is_empty() {
                        println!();
                    }
                    println!("[{}]", section.yellow());
                    current_section = section;
                }
                println!("  {} = {}", key.cyan(), value);
            }
        }
    }

    Ok(())
}

async fn simulate_command(
    config: &miwifi_cli::config::AppConfig,
    options: &SimulationOptions,
) -> Result<()> {
    eprintln!(
        "{}",
        format!(
            "Simulating {} rounds (latency {}ms, failure rate {})",
            options.rounds,
            options.latency.as_millis(),
            options.failure_rate
        )
        .bold()
        .blue()
    );

    let summary = run_simulation(config, options, print_round).await?;

    let stats = &summary.stats;
    println!();
    println!("{}", "Cache statistics:".bold());
    println!("  hits:        {}", stats.hits);
    println!("  misses:      {}", stats.misses);
    println!("  evictions:   {}", stats.evictions);
    println!("  entries:     {}", stats.size);
    println!("  bytes:       {}", stats.total_size_bytes);
    println!("  hit rate:    {:.1}%", stats.hit_rate() * 100.0);
    println!("  router calls: {}", summary.router_calls);

    Ok(())
}

fn print_round(outcome: &RoundOutcome) {
    let label = match &outcome.source {
        RoundSource::Cache => outcome.source.label().green(),
        RoundSource::Fetch => outcome.source.label().cyan(),
        RoundSource::Partial(_) => outcome.source.label().yellow(),
    };
    println!(
        "round {:>3}: {:<7} {}/4 fields in {:.1}ms",
        outcome.round,
        label,
        outcome.fields,
        outcome.elapsed.as_secs_f64() * 1000.0
    );
    if let RoundSource::Partial(error) = &outcome.source {
        println!("           {}", error.dimmed());
    }
}
