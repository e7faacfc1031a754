mod logging;
mod output;
mod settings;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dbspec_core::decode_document;
use dbspec_schema::{
    IssueSeverity, SchemaError, SpecValidator, ValidationIssue, ValidationReport,
    database_crd_yaml, database_json_schema, database_schema, report_json_schema, to_openapi_v3,
};
use output::{FileReport, emit, render_json, render_text};
use settings::{LogFormat, OutputFormat, SettingsOverrides, load_settings};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("settings error: {0}")]
    Settings(#[from] settings::SettingsError),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "dbspec", version, about = "Validate managed database specifications")]
struct Cli {
    /// Settings file (defaults to ./dbspec.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Log output format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
    /// Log filter, ex.: `info` or `dbspec_schema=debug`.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate resource documents.
    Validate(ValidateArgs),
    /// Print the JSON Schema of a resource document.
    Schema(SchemaArgs),
    /// Print the CustomResourceDefinition manifest.
    Crd(CrdArgs),
    /// Print the JSON Schema of the JSON validation report.
    ReportSchema,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// YAML or JSON documents to validate.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
    /// Report format.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// Fail when any document has warnings.
    #[arg(long, default_value_t = false)]
    deny_warnings: bool,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Write the schema to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Emit the Kubernetes structural (OpenAPI v3) form.
    #[arg(long, default_value_t = false)]
    openapi: bool,
}

#[derive(Args, Debug)]
struct CrdArgs {
    /// Write the manifest to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();

    let (format, deny_warnings) = match &cli.command {
        Command::Validate(args) => (args.format, args.deny_warnings),
        _ => (None, false),
    };
    let settings = load_settings(cli.config.as_deref())?.with_overrides(SettingsOverrides {
        output: format,
        log_format: cli.log_format,
        log_level: cli.log_level,
        deny_warnings,
    });
    logging::init_logging(settings.log_format, &settings.log_level).map_err(CliError::Logging)?;

    match cli.command {
        Command::Validate(args) => {
            run_validate(&args.files, settings.output, settings.deny_warnings)
        }
        Command::Schema(args) => {
            let document = if args.openapi {
                to_openapi_v3(database_schema())
            } else {
                database_json_schema().clone()
            };
            let schema = serde_json::to_string_pretty(&document)?;
            write_artifact(args.out.as_deref(), &schema, "schema")
        }
        Command::Crd(args) => write_artifact(args.out.as_deref(), &database_crd_yaml()?, "crd"),
        Command::ReportSchema => {
            let schema = serde_json::to_string_pretty(&report_json_schema())?;
            write_artifact(None, &schema, "report_schema")
        }
    }
}

fn run_validate(
    files: &[PathBuf],
    format: OutputFormat,
    deny_warnings: bool,
) -> Result<ExitCode, CliError> {
    let validator = SpecValidator::shared()?;
    tracing::info!(event = "validation_started", files = files.len());

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let bytes = std::fs::read(path).map_err(|source| CliError::Read {
            path: path.clone(),
            source,
        })?;
        let report = match decode_document(&bytes) {
            Ok(document) => validator
                .validate_document(&document)
                .unwrap_or_else(|err| single_error("invalid_document", err.to_string())),
            Err(err) => single_error("invalid_syntax", err.to_string()),
        };
        tracing::info!(
            event = "document_checked",
            path = %path.display(),
            errors = report.errors.len(),
            warnings = report.warnings.len()
        );
        results.push(FileReport::new(path.display().to_string(), report));
    }

    let rendered = match format {
        OutputFormat::Text => render_text(&results),
        OutputFormat::Json => render_json(&results)?,
    };
    emit(None, &rendered)?;

    let failed = results.iter().filter(|result| result.fails(deny_warnings)).count();
    tracing::info!(event = "validation_finished", files = results.len(), failed = failed);
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn single_error(code: &str, message: String) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.push_error(ValidationIssue::new(IssueSeverity::Error, code, "/", message, None));
    report
}

fn write_artifact(out: Option<&Path>, content: &str, artifact: &str) -> Result<ExitCode, CliError> {
    emit(out, content)?;
    if let Some(path) = out {
        tracing::info!(event = "artifact_written", artifact = artifact, path = %path.display());
    }
    Ok(ExitCode::SUCCESS)
}
