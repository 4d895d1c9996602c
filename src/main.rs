use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pole_mapper::config::Configuration;
use pole_mapper::io::config_store::{ConfigStore, DEFAULT_CONFIGURATION};
use pole_mapper::pipeline::{self, FileOptions};
use pole_mapper::report::Severity;
use pole_mapper::{Result, ToolError};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Process(args) => execute_process(args),
        Command::Configs(args) => execute_configs(args),
    }
}

fn execute_process(args: ProcessArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(ToolError::MissingInput(path.clone()));
            }
            Configuration::from_json_str(&std::fs::read_to_string(path)?)?
        }
        None => ConfigStore::new(&args.config_dir).load(&args.company)?,
    };

    if let Some(path) = &args.routes {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.clone()));
        }
        config.manual_routes_options.routes = std::fs::read_to_string(path)?;
        config.manual_routes_options.use_manual_routes = true;
    }
    if args.clear_existing_routes {
        config.manual_routes_options.clear_existing_routes = true;
    }
    if args.sort_by_scid {
        config.processing_options.sort_by_scid = true;
    }

    let options = FileOptions {
        sheet: args.sheet,
        header_row: args.header_row,
        geocode_cache: args.geocode_cache,
        json_output: args.json,
        qc_file: args.qc,
    };
    let outcome = pipeline::survey_to_workbook(&args.input, &args.output, &config, &options)?;

    info!(
        records = outcome.model.records.len(),
        route = %outcome.route.source,
        warnings = outcome.report.count_at_least(Severity::Warning),
        errors = outcome.report.count_at_least(Severity::Error),
        output = %args.output.display(),
        "workbook written"
    );
    Ok(())
}

fn execute_configs(args: ConfigsArgs) -> Result<()> {
    let store = ConfigStore::new(&args.config_dir);
    match args.action {
        ConfigsAction::List => {
            for name in store.available()? {
                println!("{name}");
            }
        }
        ConfigsAction::Show { name } => {
            let config = store.load(&name)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigsAction::Import { name, file } => {
            if !file.exists() {
                return Err(ToolError::MissingInput(file));
            }
            let config = Configuration::from_json_str(&std::fs::read_to_string(&file)?)?;
            let path = store.save(&name, &config)?;
            println!("{}", path.display());
        }
        ConfigsAction::Delete { name } => store.delete(&name)?,
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Classify utility-pole survey rows and map them onto the consumer template."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a survey workbook into a consumer workbook.
    Process(ProcessArgs),
    /// Manage stored company configurations.
    Configs(ConfigsArgs),
}

#[derive(clap::Args)]
struct ProcessArgs {
    /// Survey workbook (.xlsx).
    #[arg(long)]
    input: PathBuf,

    /// Output workbook path.
    #[arg(long)]
    output: PathBuf,

    /// Stored company configuration to use.
    #[arg(long, default_value = DEFAULT_CONFIGURATION)]
    company: String,

    /// Directory holding the stored configurations.
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Configuration file to use instead of a stored company.
    #[arg(long, conflicts_with = "company")]
    config: Option<PathBuf>,

    /// Survey sheet name; the first sheet when omitted.
    #[arg(long)]
    sheet: Option<String>,

    /// 1-based row holding the survey column labels.
    #[arg(long, default_value_t = 1)]
    header_row: usize,

    /// Manual route file: one route per line, pole ids separated by commas.
    #[arg(long)]
    routes: Option<PathBuf>,

    /// Drop "To Pole" links that the manual routes do not cover.
    #[arg(long)]
    clear_existing_routes: bool,

    /// QC workbook with "Pole" and "To Pole" columns; its connections order
    /// and restrict the output.
    #[arg(long)]
    qc: Option<PathBuf>,

    /// Order poles by SCID instead of survey order.
    #[arg(long)]
    sort_by_scid: bool,

    /// CSV cache of reverse geocoding results (latitude,longitude,address).
    #[arg(long)]
    geocode_cache: Option<PathBuf>,

    /// Also write the normalized records and issues as JSON.
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ConfigsArgs {
    /// Directory holding the stored configurations.
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    action: ConfigsAction,
}

#[derive(Subcommand)]
enum ConfigsAction {
    /// List the stored configurations.
    List,
    /// Print a configuration as JSON.
    Show { name: String },
    /// Validate a JSON configuration file and store it under a company name.
    Import { name: String, file: PathBuf },
    /// Delete a stored company configuration.
    Delete { name: String },
}
