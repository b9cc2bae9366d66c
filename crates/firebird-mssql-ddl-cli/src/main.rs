//! firebird-mssql-ddl CLI - Firebird to SQL Server DDL conversion.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use firebird_mssql_ddl::{
    split_batches, Config, ConvertError, Converter, SchemaSnapshot, StructuralPolicy,
    TypeMappingDocument,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "firebird-mssql-ddl")]
#[command(about = "Convert a Firebird schema to SQL Server DDL and a versioned changelog")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a metadata snapshot into DDL and a changelog
    Convert {
        /// Metadata snapshot (JSON); overrides input.metadata
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Type-mapping overrides (JSON or YAML); overrides input.type_mapping
        #[arg(long)]
        type_mapping: Option<PathBuf>,

        /// Changelog output path; overrides output.changelog
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a plain SQL script with GO separators
        #[arg(long)]
        sql_script: Option<PathBuf>,

        /// Changelog author [default: current user]
        #[arg(long)]
        author: Option<String>,

        /// Changelog date as YYYY/MM/DD [default: today]
        #[arg(long)]
        date: Option<String>,

        /// Skip statements that cannot be built instead of failing
        #[arg(long)]
        skip_invalid: bool,
    },

    /// Load a type-mapping document and list its rules
    CheckMappings {
        /// Type-mapping document (JSON or YAML)
        path: PathBuf,
    },

    /// Split a SQL script into batches on GO lines
    Split {
        /// SQL script
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), ConvertError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(ConvertError::Config)?;

    match cli.command {
        Commands::CheckMappings { path } => check_mappings(&path, cli.output_json),
        Commands::Split { path } => split(&path, cli.output_json),
        Commands::Convert {
            metadata,
            type_mapping,
            output,
            sql_script,
            author,
            date,
            skip_invalid,
        } => {
            let mut config = load_config(&cli.config, metadata.as_deref())?;

            // Apply overrides
            if let Some(path) = metadata {
                config.input.metadata = path;
            }
            if let Some(path) = type_mapping {
                config.input.type_mapping = Some(path);
            }
            if let Some(path) = output {
                config.output.changelog = path;
            }
            if let Some(path) = sql_script {
                config.output.sql_script = Some(path);
            }
            if let Some(name) = author {
                config.conversion.author = Some(name);
            }
            if skip_invalid {
                config.conversion.on_structural_error = StructuralPolicy::Skip;
            }
            config.validate()?;

            let created = match date {
                Some(d) => parse_date(&d)?,
                None => chrono::Local::now().date_naive(),
            };

            convert(&config, created, cli.output_json)
        }
    }
}

/// Load the config file. A missing file is tolerated when the metadata path
/// comes from the command line.
fn load_config(path: &Path, metadata: Option<&Path>) -> Result<Config, ConvertError> {
    match metadata {
        Some(metadata) if !path.exists() => {
            info!("No configuration at {:?}, using defaults", path);
            Ok(Config::for_metadata(metadata))
        }
        _ => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        }
    }
}

fn convert(config: &Config, created: NaiveDate, output_json: bool) -> Result<(), ConvertError> {
    let snapshot = SchemaSnapshot::load(&config.input.metadata)?;
    info!("Loaded metadata snapshot from {:?}", config.input.metadata);

    let converter = Converter::from_config(config);
    let metadata = config.changelog_metadata(&current_user(), created);
    let result = converter.convert(&snapshot, &metadata)?;

    result.changelog.write(&config.output.changelog)?;
    if let Some(path) = &config.output.sql_script {
        std::fs::write(path, result.sql_script())?;
        info!("Wrote SQL script to {:?}", path);
    }

    for w in &result.warnings {
        warn!("{}", w);
    }

    if output_json {
        println!("{}", result.to_json()?);
    } else {
        println!("\nConversion completed!");
        println!("  Duration: {:.2}s", result.duration_seconds);
        println!("  Tables: {}", result.counts.tables);
        println!("  Foreign keys: {}", result.counts.foreign_keys);
        println!("  Indexes: {}", result.counts.indexes);
        println!("  Sequences: {}", result.counts.sequences);
        println!("  Procedures: {}", result.counts.procedures);
        println!("  Triggers: {}", result.counts.triggers);
        println!("  Changelog entries: {}", result.changelog.entries.len());
        println!("  Changelog: {}", config.output.changelog.display());
        if let Some(path) = &config.output.sql_script {
            println!("  SQL script: {}", path.display());
        }
        println!("  Fingerprint: {}", result.fingerprint);
        if !result.warnings.is_empty() {
            println!("  Warnings: {}", result.warnings.len());
        }
    }

    Ok(())
}

fn check_mappings(path: &Path, output_json: bool) -> Result<(), ConvertError> {
    let doc = TypeMappingDocument::load(path)?;

    if output_json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("{} rule(s) in {}", doc.custom_mappings.len(), path.display());
    for (i, rule) in doc.custom_mappings.iter().enumerate() {
        match &rule.note {
            Some(note) => println!("  {:>3}. {}  ({})", i + 1, rule.describe(), note),
            None => println!("  {:>3}. {}", i + 1, rule.describe()),
        }
    }
    Ok(())
}

fn split(path: &Path, output_json: bool) -> Result<(), ConvertError> {
    let script = std::fs::read_to_string(path)?;
    let batches = split_batches(&script);

    if output_json {
        println!("{}", serde_json::to_string_pretty(&batches)?);
    } else {
        println!("{} batch(es) in {}", batches.len(), path.display());
    }
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate, ConvertError> {
    NaiveDate::parse_from_str(value, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|e| ConvertError::Config(format!("invalid --date '{}': {}", value, e)))
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
