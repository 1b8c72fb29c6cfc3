//! `pqdif` command line entry point.
//!
//! # Responsibility
//! - Inspect the tag registry and build demonstration data source records.
//! - Keep output deterministic apart from the effective timestamp of `demo`.

use clap::{Parser, Subcommand};
use log::{debug, info};
use pqdif_core::{
    CoreConfig, DataSourceRecord, DataSourceType, Phase, QuantityMeasured, TagRegistry,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

/// Inspect PQDIF tag definitions and data source records.
#[derive(Parser, Debug)]
#[command(name = "pqdif", version)]
struct Cli {
    /// JSON config file.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log level override (trace|debug|info|warn|error).
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every tag in the active registry.
    Tags,
    /// Show the definition of one tag.
    Resolve { tag: Uuid },
    /// Show the registry name of a data source type id.
    DataSourceType { id: Uuid },
    /// Build a data source record with one channel and print it as JSON.
    Demo { name: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    }
    .with_env_overrides();
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.init_logging()?;

    let registry = config.tag_registry()?;
    debug!(
        "event=cli_start module=cli tags={} command={:?}",
        registry.source().len(),
        cli.command
    );

    match cli.command {
        Command::Tags => list_tags(&registry),
        Command::Resolve { tag } => resolve_tag(&registry, tag)?,
        Command::DataSourceType { id } => {
            println!("{}", DataSourceType::display_name(&registry, id));
        }
        Command::Demo { name } => demo(&registry, &name)?,
    }
    Ok(())
}

fn list_tags(registry: &TagRegistry) {
    for definition in registry.source().iter() {
        println!("{}  {}", definition.id, definition.name);
    }
}

fn resolve_tag(registry: &TagRegistry, tag: Uuid) -> Result<(), Box<dyn Error>> {
    match registry.resolve(tag) {
        Some(definition) => println!("{}", serde_json::to_string_pretty(&definition)?),
        None => println!("{}", registry.display_name(tag)),
    }
    Ok(())
}

fn demo(registry: &TagRegistry, name: &str) -> Result<(), Box<dyn Error>> {
    let mut record = DataSourceRecord::create(name);
    record.set_data_source_type_id(DataSourceType::MEASURE);
    {
        let mut channel = record.add_channel_definition();
        channel.set_channel_name("V1");
        channel.set_phase(Phase::An);
        channel.set_quantity_measured(QuantityMeasured::Voltage);
    }

    info!(
        "event=demo_record module=cli status=ok type={} channels={}",
        DataSourceType::display_name(registry, record.data_source_type_id()?),
        record.channel_definitions()?.len()
    );
    println!("{}", serde_json::to_string_pretty(record.physical_record())?);
    Ok(())
}
