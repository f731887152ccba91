//! Selection of media files under an input directory.

use crate::config::FileMatcher;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Errors that can occur while listing files.
#[derive(Debug)]
pub enum ScanError {
    /// The input root does not exist or is not a directory.
    InvalidRoot(PathBuf),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::InvalidRoot(path) => write!(
                f,
                "Input directory '{}' does not exist or is not a directory",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ScanError {}

/// Recursively list files under `root` accepted by `matcher`.
///
/// Subdirectories whose name is excluded are pruned at any depth; the root
/// itself is always walked. Results are sorted by path.
#[tracing::instrument(skip(matcher))]
pub fn list_files(root: &Path, matcher: &FileMatcher) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::InvalidRoot(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_pruned(entry, matcher));

    let mut files = Vec::new();
    for entry in walker {
        // Guard: walk errors (e.g. permission denied)
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        // Guard: directories and links to anything but files
        if !is_regular_file(&entry) {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if !matcher.matches_file_name(&file_name) {
            tracing::trace!("No match for {}", entry.path().display());
            continue;
        }
        files.push(entry.into_path());
    }

    files.sort();
    tracing::debug!("Found {} matching files under {}", files.len(), root.display());
    Ok(files)
}

fn is_pruned(entry: &DirEntry, matcher: &FileMatcher) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let pruned = matcher.is_excluded_dir(&entry.file_name().to_string_lossy());
    if pruned {
        tracing::debug!("Excluding directory {}", entry.path().display());
    }
    pruned
}

fn is_regular_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use test_log::test;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "data").unwrap();
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_lists_matching_files_recursively() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        touch(root, "Show - 02.mkv");
        touch(root, "Show - 01.MKV");
        touch(root, "Season 1/Show - 03.mp4");
        touch(root, "Show - 01.ass");

        let matcher = FileMatcher::new(&[], &["*.mkv".to_string(), "*.mp4".to_string()]).unwrap();
        let files = list_files(root, &matcher).unwrap();

        assert_eq!(
            relative(root, &files),
            vec!["Season 1/Show - 03.mp4", "Show - 01.MKV", "Show - 02.mkv"]
        );
    }

    #[test]
    fn test_excluded_dirs_are_pruned_at_any_depth() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        touch(root, "ep01.mkv");
        touch(root, "SPs/sp01.mkv");
        touch(root, "Season 1/SPs/sp02.mkv");
        touch(root, "Season 1/ep02.mkv");
        touch(root, "SPs-extra/ep03.mkv");

        let matcher = FileMatcher::new(&["SPs".to_string()], &["*.mkv".to_string()]).unwrap();
        let files = list_files(root, &matcher).unwrap();

        assert_eq!(
            relative(root, &files),
            vec!["SPs-extra/ep03.mkv", "Season 1/ep02.mkv", "ep01.mkv"]
        );
    }

    #[test]
    fn test_root_named_like_excluded_dir_is_walked() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("SPs");
        touch(&root, "sp01.mkv");

        let matcher = FileMatcher::new(&["SPs".to_string()], &[]).unwrap();
        let files = list_files(&root, &matcher).unwrap();

        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_empty_patterns_match_all_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        touch(root, "a.txt");
        touch(root, "b/c.nfo");

        let matcher = FileMatcher::new(&[], &[]).unwrap();
        assert_eq!(list_files(root, &matcher).unwrap().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_to_files_are_selected_but_dirs_not_followed() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let real = temp_dir.path().join("real");
        let root = temp_dir.path().join("in");
        touch(&real, "a.mkv");
        touch(&real, "d/b.mkv");
        fs::create_dir_all(&root).unwrap();
        symlink(real.join("a.mkv"), root.join("a.mkv")).unwrap();
        symlink(real.join("d"), root.join("d")).unwrap();
        symlink(real.join("gone.mkv"), root.join("dangling.mkv")).unwrap();

        let matcher = FileMatcher::new(&[], &["*.mkv".to_string()]).unwrap();
        let files = list_files(&root, &matcher).unwrap();

        assert_eq!(relative(&root, &files), vec!["a.mkv"]);
    }

    #[test]
    fn test_missing_root() {
        let matcher = FileMatcher::new(&[], &[]).unwrap();
        let result = list_files(Path::new("/non/existent/path"), &matcher);
        assert!(matches!(result, Err(ScanError::InvalidRoot(_))));
    }
}
