use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use facility_core::{Facility, FacilityError, FilterSpecification, RegistryConfig};
use facility_registry::{
    derive_reference_options, normalize_documents_str, validate_form, Aggregator, FacilityForm,
    FilterEngine,
};
use serde_json::Value;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "facility-cli",
    about = "Normalize, filter and summarize health facility records from JSON exports."
)]
struct Args {
    /// Optional TOML or JSON file overriding the registry configuration.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print canonical facilities for a file of raw documents.
    Normalize {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Filter raw documents with a filter specification.
    Filter {
        #[arg(short, long)]
        input: PathBuf,
        /// JSON file holding the filter specification.
        #[arg(short, long)]
        filter: PathBuf,
    },
    /// Print the backend query constraints a filter compiles to.
    Compile {
        #[arg(short, long)]
        filter: PathBuf,
    },
    /// Aggregate counts for a file of raw documents.
    Stats {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Distinct type, owner and affiliation options.
    Options {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Check a facility form payload.
    Validate {
        #[arg(short, long)]
        form: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = load_config(args.config.as_deref())?;
    debug!(page_size = config.page_size, "configuration loaded");

    match args.command {
        Command::Normalize { input } => {
            let facilities = read_facilities(&input, &config)?;
            print_json(&facilities)
        }
        Command::Filter { input, filter } => {
            let facilities = read_facilities(&input, &config)?;
            let spec = read_filter(&filter)?;
            let matched = FilterEngine::from_config(&config).filter(&facilities, &spec);
            info!(total = facilities.len(), matched = matched.len(), "filter applied");
            print_json(&matched)
        }
        Command::Compile { filter } => {
            let spec = read_filter(&filter)?;
            print_json(&FilterEngine::from_config(&config).compile(&spec))
        }
        Command::Stats { input } => {
            let facilities = read_facilities(&input, &config)?;
            let stats = Aggregator::new(config.tables.owner_categories.clone())
                .build_stats(&facilities);
            print_json(&stats)
        }
        Command::Options { input } => {
            let facilities = read_facilities(&input, &config)?;
            print_json(&derive_reference_options(
                &facilities,
                &config.presets,
                &config.tables.labels,
            ))
        }
        Command::Validate { form } => {
            let payload = read_json(&form)?;
            let form: FacilityForm =
                serde_json::from_value(payload).context("Form payload has an unexpected shape")?;
            match validate_form(&form) {
                Ok(()) => {
                    println!("Form is valid");
                    Ok(())
                }
                Err(FacilityError::Validation(report)) => {
                    print_json(&report)?;
                    anyhow::bail!("form has {} invalid field(s)", report.errors.len())
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter_directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "facility_registry=info,facility_cli=info".to_string());

    let builder = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Built-in defaults, then the optional file, then `FACILITY__*` variables.
fn load_config(path: Option<&Path>) -> anyhow::Result<RegistryConfig> {
    let mut builder = Config::builder().add_source(
        Config::try_from(&RegistryConfig::default()).context("Unable to encode default config")?,
    );
    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }

    builder
        .add_source(Environment::with_prefix("FACILITY").separator("__"))
        .build()
        .context("Unable to assemble configuration")?
        .try_deserialize()
        .context("Configuration has an unexpected shape")
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read file {path:?}"))?;
    serde_json::from_str(&data).with_context(|| format!("File {path:?} is not valid JSON"))
}

fn read_facilities(path: &Path, config: &RegistryConfig) -> anyhow::Result<Vec<Facility>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read file {path:?}"))?;
    let facilities = normalize_documents_str(&data, config)?;
    info!(count = facilities.len(), "documents normalized");
    Ok(facilities)
}

fn read_filter(path: &Path) -> anyhow::Result<FilterSpecification> {
    serde_json::from_value(read_json(path)?).context("Filter specification has an unexpected shape")
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
