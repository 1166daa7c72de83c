use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use hxsema::config::Config;
use hxsema::diagnostics::{self, AnalysisError, Diagnostic};
use hxsema::SourceFile;

#[derive(Parser)]
#[command(name = "hxsema", version, about = "Semantic checks for Haxe sources")]
struct Cli {
    /// More logging on stderr (repeat for trace output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check source files and report diagnostics
    Check {
        /// Source files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Path to hxsema.toml (default: searched upward from the current directory)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(serde::Serialize)]
struct FileReport<'a> {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    syntax_error: Option<String>,
    diagnostics: Vec<&'a Diagnostic>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();

    match cli.command {
        Commands::Check { files, config, format } => match check(&files, config, format) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(err) => {
                diagnostics::render_error("", "", &err);
                ExitCode::FAILURE
            }
        },
    }
}

/// `Ok(true)` when no file has a syntax error or an error diagnostic.
fn check(paths: &[PathBuf], config: Option<PathBuf>, format: Format) -> Result<bool, AnalysisError> {
    let config = match config {
        Some(path) => Config::load(&path)?,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| AnalysisError::io(format!("could not read current directory: {e}"), PathBuf::from(".")))?;
            Config::discover(&cwd)?
        }
    };
    let options = config.validation_options();

    let files = paths.iter().map(|p| SourceFile::read(p)).collect::<Result<Vec<_>, _>>()?;
    let (project, failures) = hxsema::parse_sources(&files);
    let diagnostics = hxsema::analyze(&project, &options);

    let clean = failures.is_empty() && !diagnostics.iter().any(Diagnostic::is_error);

    match format {
        Format::Text => {
            for (idx, err) in &failures {
                let file = &files[*idx];
                diagnostics::render_error(&file.text, &file.display_name(), err);
            }
            for diagnostic in &diagnostics {
                let file = &files[diagnostic.span.file_id as usize];
                diagnostics::render_diagnostic(&file.text, &file.display_name(), diagnostic);
            }
        }
        Format::Json => {
            let reports: Vec<FileReport<'_>> = files
                .iter()
                .enumerate()
                .map(|(idx, file)| FileReport {
                    file: file.display_name(),
                    syntax_error: failures.iter().find(|(i, _)| *i == idx).map(|(_, e)| e.to_string()),
                    diagnostics: diagnostics.iter().filter(|d| d.span.file_id as usize == idx).collect(),
                })
                .collect();
            let json = serde_json::to_string_pretty(&reports)
                .map_err(|e| AnalysisError::io(format!("could not encode report: {e}"), PathBuf::from("-")))?;
            println!("{json}");
        }
    }
    Ok(clean)
}
