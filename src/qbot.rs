//! The rename pipeline: select files, optionally stage them, run the renamer
//! and clean up.

use crate::config::QbotConfig;
use crate::filebot::{ConflictPolicy, FileBotError, RenameAction, RenameRequest, Renamer};
use crate::output::OutputFormatter;
use crate::scanner::{self, ScanError};
use crate::stager::{self, StageError};
use std::path::{Path, PathBuf};

/// One rename run, as requested on the command line.
#[derive(Debug, Clone)]
pub struct RenameJob {
    /// Title used as the FileBot query and the staging directory name.
    pub media_name: String,
    /// Absolute directory holding the downloaded files.
    pub input_root: PathBuf,
    /// Configured category name, e.g. `anime`.
    pub category: String,
    pub filter: Option<String>,
    /// Pass `-non-strict` to FileBot.
    pub fuzzy: bool,
    /// Stage files under `temp_dir` instead of renaming in place.
    pub use_temp: bool,
    /// Plan only; touch nothing and do not run the renamer.
    pub dry_run: bool,
}

/// Where a file would be moved to during staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// What a dry run would have done.
#[derive(Debug, Clone)]
pub struct RenamePlan {
    pub files: Vec<PathBuf>,
    /// Empty in direct mode.
    pub moves: Vec<PlannedMove>,
    pub request: RenameRequest,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub enum RenameOutcome {
    /// Nothing under the input root matched.
    NoFiles,
    /// FileBot ran successfully on `file_count` files in `work_path`.
    Renamed {
        file_count: usize,
        work_path: PathBuf,
        output: PathBuf,
    },
    DryRun(RenamePlan),
}

/// Errors that can end a rename run.
#[derive(Debug)]
pub enum QbotError {
    /// The category is not present in the configuration.
    UnknownCategory(String),
    InvalidRules(crate::config::ConfigError),
    Scan(ScanError),
    Stage(StageError),
    /// FileBot failed; files are left in `work_path`.
    Renamer {
        media_name: String,
        work_path: PathBuf,
        staged: bool,
        source: FileBotError,
    },
    /// FileBot succeeded but the working directory could not be removed.
    Cleanup(StageError),
}

impl std::fmt::Display for QbotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCategory(name) => write!(f, "Invalid category '{}'", name),
            Self::InvalidRules(e) => write!(f, "{}", e),
            Self::Scan(e) => write!(f, "{}", e),
            Self::Stage(e) => write!(f, "Error staging files: {}", e),
            Self::Renamer {
                media_name,
                work_path,
                staged,
                source,
            } => write!(
                f,
                "Error renaming '{}' ({}) -> {}. Files remain in {}",
                media_name,
                if *staged { "temp" } else { "direct" },
                source,
                work_path.display()
            ),
            Self::Cleanup(e) => write!(f, "Renamed, but cleanup failed: {}", e),
        }
    }
}

impl std::error::Error for QbotError {}

/// Runs rename jobs against a configuration with a given renamer.
pub struct QBot<R: Renamer> {
    config: QbotConfig,
    renamer: R,
}

impl<R: Renamer> QBot<R> {
    pub fn new(config: QbotConfig, renamer: R) -> Self {
        Self { config, renamer }
    }

    pub fn renamer(&self) -> &R {
        &self.renamer
    }

    /// Select, stage and rename the files of `job`.
    ///
    /// On renamer failure staged files are left in the staging directory and
    /// the error names it. On success the working directory is removed.
    #[tracing::instrument(skip(self), fields(media = %job.media_name, category = %job.category))]
    pub fn rename(&self, job: &RenameJob) -> Result<RenameOutcome, QbotError> {
        let category = self
            .config
            .category(&job.category)
            .ok_or_else(|| QbotError::UnknownCategory(job.category.clone()))?;
        let matcher = category.compile().map_err(QbotError::InvalidRules)?;

        tracing::debug!(
            "Listing files in {} with patterns: {:?} and excluding dirs: {:?}",
            job.input_root.display(),
            category.match_patterns,
            category.exclude_dirs
        );
        let files = scanner::list_files(&job.input_root, &matcher).map_err(QbotError::Scan)?;
        if files.is_empty() {
            tracing::warn!("No source files found for '{}'", job.media_name);
            return Ok(RenameOutcome::NoFiles);
        }

        let staging_root = if job.use_temp {
            Some(
                stager::staging_dir_for(&self.config.temp_dir, &job.media_name)
                    .map_err(QbotError::Stage)?,
            )
        } else {
            None
        };
        let work_path = staging_root.clone().unwrap_or_else(|| job.input_root.clone());

        let request = RenameRequest {
            format: Some(category.format.clone()),
            filter: job.filter.clone(),
            query: Some(job.media_name.clone()),
            db: Some(category.db.as_str().to_string()),
            action: Some(RenameAction::Move),
            conflict: Some(ConflictPolicy::Replace),
            non_strict: job.fuzzy,
            ..RenameRequest::new(&work_path, &category.path)
        };

        if job.dry_run {
            let moves = match &staging_root {
                Some(root) => plan_moves(&files, &job.input_root, root),
                None => Vec::new(),
            };
            return Ok(RenameOutcome::DryRun(RenamePlan {
                files,
                moves,
                request,
            }));
        }

        if let Some(root) = &staging_root {
            let progress = OutputFormatter::create_progress_bar(files.len() as u64);
            let staged = stager::stage_files(&files, &job.input_root, root, &progress);
            progress.finish_and_clear();
            let staged = staged.map_err(QbotError::Stage)?;
            tracing::info!("Staged {} files into {}", staged.len(), root.display());
        }

        if let Err(source) = self.renamer.rename(&request) {
            tracing::error!(
                "Error renaming '{}' ({}) -> {}",
                job.media_name,
                if job.use_temp { "temp" } else { "direct" },
                source
            );
            return Err(QbotError::Renamer {
                media_name: job.media_name.clone(),
                work_path,
                staged: job.use_temp,
                source,
            });
        }

        stager::cleanup_directory(&work_path).map_err(QbotError::Cleanup)?;

        Ok(RenameOutcome::Renamed {
            file_count: files.len(),
            work_path,
            output: category.path.clone(),
        })
    }
}

fn plan_moves(files: &[PathBuf], input_root: &Path, staging_root: &Path) -> Vec<PlannedMove> {
    files
        .iter()
        .filter_map(|file| {
            let relative = file.strip_prefix(input_root).ok()?;
            Some(PlannedMove {
                source: file.clone(),
                destination: staging_root.join(relative),
            })
        })
        .collect()
}
