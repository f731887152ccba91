/// Staging of matched files into a per-title working directory.
///
/// Files are moved out of the download directory into `<temp_dir>/<title>/`,
/// keeping their path relative to the input root, so that FileBot only ever
/// sees the files that were selected. After a successful rename the working
/// directory is removed again.
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};

/// A file that was moved into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// The path of the file before staging.
    pub original_path: PathBuf,
    /// The path of the file inside the staging directory.
    pub staged_path: PathBuf,
}

/// Errors that can occur while staging or cleaning up files.
#[derive(Debug)]
pub enum StageError {
    /// Failed to create a directory inside the staging root.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move a file into the staging root.
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
    /// The file is not located under the input root.
    OutsideInputRoot { file: PathBuf, input_root: PathBuf },
    /// The media name cannot be used as a directory name.
    InvalidMediaName(String),
    /// Failed to remove the working directory.
    CleanupFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::OutsideInputRoot { file, input_root } => write!(
                f,
                "{} is not inside input directory {}",
                file.display(),
                input_root.display()
            ),
            Self::InvalidMediaName(name) => {
                write!(f, "Media name '{}' cannot be used as a directory name", name)
            }
            Self::CleanupFailed { path, source } => {
                write!(f, "Failed to clean up {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for StageError {}

/// Result type for staging operations.
pub type StageResult<T> = Result<T, StageError>;

/// Returns the staging directory for a media name under `temp_dir`.
///
/// Path separators in the name are replaced with `_` so the directory always
/// sits directly below `temp_dir`.
///
/// # Examples
///
/// ```
/// use qbot::stager::staging_dir_for;
/// use std::path::Path;
///
/// let dir = staging_dir_for(Path::new("/tmp/qbot"), "Fate/Zero").unwrap();
/// assert_eq!(dir, Path::new("/tmp/qbot/Fate_Zero"));
/// ```
pub fn staging_dir_for(temp_dir: &Path, media_name: &str) -> StageResult<PathBuf> {
    let component = media_name.trim().replace(['/', '\\'], "_");
    if component.is_empty() || component == "." || component == ".." {
        return Err(StageError::InvalidMediaName(media_name.to_string()));
    }
    Ok(temp_dir.join(component))
}

/// Moves files into `staging_root`, preserving their path relative to `input_root`.
///
/// Parent directories are created as needed. `progress` is advanced once per file.
///
/// # Returns
///
/// The staged files in input order, or the first error encountered. Files
/// moved before an error stay in the staging directory.
pub fn stage_files(
    files: &[PathBuf],
    input_root: &Path,
    staging_root: &Path,
    progress: &ProgressBar,
) -> StageResult<Vec<StagedFile>> {
    let mut staged = Vec::with_capacity(files.len());

    for file in files {
        let relative = file
            .strip_prefix(input_root)
            .map_err(|_| StageError::OutsideInputRoot {
                file: file.clone(),
                input_root: input_root.to_path_buf(),
            })?;
        let destination = staging_root.join(relative);

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| StageError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        move_file(file, &destination)?;
        tracing::debug!("MOVED ({}) -> ({})", file.display(), destination.display());

        progress.set_message(relative.to_string_lossy().to_string());
        progress.inc(1);
        staged.push(StagedFile {
            original_path: file.clone(),
            staged_path: destination,
        });
    }

    Ok(staged)
}

/// Moves a single file, falling back to copy and remove when rename fails
/// (e.g. when the staging root is on another filesystem).
///
/// If the source cannot be removed after copying, the copy is deleted again so
/// the file only exists at its original path. The fallback needs a second
/// filesystem to trigger and is not covered by the unit tests.
fn move_file(source: &Path, destination: &Path) -> StageResult<()> {
    let rename_error = match fs::rename(source, destination) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    tracing::debug!(
        error = %rename_error,
        "Rename failed for {}, falling back to copy+remove",
        source.display()
    );

    let failure = |e: std::io::Error| StageError::FileMoveFailure {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        source_error: e,
    };
    fs::copy(source, destination).map_err(failure)?;
    if let Err(e) = fs::remove_file(source) {
        if let Err(undo) = fs::remove_file(destination) {
            tracing::warn!(
                error = %undo,
                "Copy left behind at {}",
                destination.display()
            );
        }
        return Err(failure(e));
    }
    Ok(())
}

/// Removes everything under `path` and then `path` itself.
///
/// A missing path is not an error.
pub fn cleanup_directory(path: &Path) -> StageResult<()> {
    if !path.exists() {
        return Ok(());
    }

    let failure = |e: std::io::Error| StageError::CleanupFailed {
        path: path.to_path_buf(),
        source: e,
    };
    for entry in fs::read_dir(path).map_err(failure)? {
        let item = entry.map_err(failure)?.path();
        if item.is_dir() && !item.is_symlink() {
            fs::remove_dir_all(&item).map_err(failure)?;
        } else {
            fs::remove_file(&item).map_err(failure)?;
        }
    }
    fs::remove_dir(path).map_err(failure)?;

    tracing::debug!("Cleaned up directory: {}", path.display());
    Ok(())
}
