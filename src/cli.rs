//! Command-line interface module for qbot.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Merging `--extra` settings into the arguments and configuration
//! - Input validation
//! - Running the rename pipeline and reporting its outcome

use crate::config::QbotConfig;
use crate::extra_args::ExtraArguments;
use crate::filebot::FileBot;
use crate::logging::DEFAULT_LOG_DIR;
use crate::output::OutputFormatter;
use crate::qbot::{QBot, RenameJob, RenameOutcome};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// Media category, selecting a block of the configuration's `categories`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediaCategory {
    Anime,
    Tv,
    Movie,
}

impl MediaCategory {
    /// Key of this category in the configuration file.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Anime => "anime",
            MediaCategory::Tv => "tv",
            MediaCategory::Movie => "movie",
        }
    }
}

/// Stage downloaded media and rename it into a library with FileBot.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long)]
    pub config: PathBuf,

    /// Input directory containing media files to rename.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Name of the media, used as the FileBot query.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Category of the media files.
    #[arg(short, long, value_enum)]
    pub category: MediaCategory,

    /// File filter expression passed to FileBot.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Let FileBot accept less certain matches.
    #[arg(long)]
    pub fuzzy: bool,

    /// Rename in place without staging. The input directory is removed afterwards.
    #[arg(long)]
    pub direct: bool,

    /// Show what would be staged and the FileBot command without staging or renaming.
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Comma-separated KEY:VALUE pairs. Keys: NAME, FILTER, EXCLUDES (';'-separated), DIRECT.
    #[arg(long)]
    pub extra: Option<String>,

    /// Directory for log files.
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log: PathBuf,

    /// Print version.
    #[arg(short = 'v', long, action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,
}

/// Pick the media name: a non-empty extra `NAME` wins over `--name`.
fn resolve_media_name(cli_name: Option<&str>, extra_name: Option<&str>) -> Result<String, String> {
    let chosen = extra_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .or(cli_name.map(str::trim));

    match chosen {
        None => Err("Media name is required. Please provide a name using -n or --name.".to_string()),
        Some("") => Err("Media name cannot be empty. Please provide a valid name.".to_string()),
        Some(name) => Ok(name.to_string()),
    }
}

/// Runs the CLI application with parsed arguments.
///
/// This function:
/// 1. Loads the JSON configuration (a dry run does not create `temp_dir`)
/// 2. Merges `--extra` settings over the arguments
/// 3. Validates the input directory
/// 4. Locates FileBot (skipped for dry runs)
/// 5. Runs the rename pipeline and prints the outcome
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use qbot::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["qbot", "--config", "qbot.json", "-i", "/downloads/Show", "-n", "Show", "-c", "tv"]);
/// match run_cli(&cli) {
///     Ok(_) => println!("Operation completed successfully"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<RenameOutcome, String> {
    let loaded = if cli.dry_run {
        QbotConfig::read(&cli.config)
    } else {
        QbotConfig::load(&cli.config)
    };
    let mut config = loaded.map_err(|e| format!("Error loading configuration: {}", e))?;

    let extra = ExtraArguments::parse(cli.extra.as_deref().unwrap_or_default());
    let filter = extra.filter.clone().or_else(|| cli.filter.clone());
    let media_name = resolve_media_name(cli.name.as_deref(), extra.name.as_deref())?;

    let category = cli.category.as_str();
    if config.category(category).is_none() {
        return Err(format!("Invalid category '{}'", category));
    }
    if !extra.excludes.is_empty() {
        config.extend_excludes(category, &extra.excludes);
        tracing::debug!("Added extra exclude directories: {:?}", extra.excludes);
    }

    let input_root = std::path::absolute(&cli.input).unwrap_or_else(|_| cli.input.clone());
    if !input_root.is_dir() {
        return Err(format!(
            "Input directory '{}' does not exist or is not a directory.",
            input_root.display()
        ));
    }

    let job = RenameJob {
        media_name,
        input_root,
        category: category.to_string(),
        filter,
        fuzzy: cli.fuzzy,
        use_temp: !(cli.direct || extra.is_direct),
        dry_run: cli.dry_run,
    };

    let filebot = if cli.dry_run {
        FileBot::locate(config.filebot.as_deref())
            .unwrap_or_else(|_| FileBot::with_executable("filebot"))
    } else {
        FileBot::locate_verified(config.filebot.as_deref()).map_err(|e| e.to_string())?
    };

    OutputFormatter::info(&format!(
        "Renaming '{}' from {} ({})",
        job.media_name,
        job.input_root.display(),
        if job.use_temp { "staged" } else { "direct" }
    ));

    let qbot = QBot::new(config, filebot);
    let outcome = qbot.rename(&job).map_err(|e| e.to_string())?;

    match &outcome {
        RenameOutcome::DryRun(plan) => {
            OutputFormatter::dry_run_plan(plan, &qbot.renamer().command_line(&plan.request));
        }
        other => OutputFormatter::outcome(other),
    }

    Ok(outcome)
}
