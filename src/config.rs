//! JSON configuration for qbot.
//!
//! The configuration names a staging directory and, per media category, the
//! library path, FileBot naming format and metadata database to use. Exclusion
//! and match rules can be set globally under `defaults` and overridden per
//! category.
//!
//! # Configuration File Format
//!
//! ```json
//! {
//!   "temp_dir": "~/qbot/tmp",
//!   "defaults": {
//!     "exclude_dirs": ["Extras", "Samples"],
//!     "match_patterns": ["*.mkv", "*.mp4"]
//!   },
//!   "categories": {
//!     "anime": {
//!       "path": "/media/anime",
//!       "format": "{n}/Season {s}/{n} - {s00e00} - {t}",
//!       "db": "AniDB",
//!       "exclude_dirs": ["SPs", "CDs"]
//!     }
//!   }
//! }
//! ```

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// The configuration path does not have a `.json` extension.
    NotJson(PathBuf),
    /// Invalid JSON syntax or structure.
    ConfigInvalid(String),
    /// Invalid glob pattern in `match_patterns`.
    InvalidGlobPattern { pattern: String, reason: String },
    /// IO error while reading configuration or creating `temp_dir`.
    IoError { path: PathBuf, source: std::io::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::NotJson(path) => write!(
                f,
                "Configuration file must be a JSON file: {}",
                path.display()
            ),
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern { pattern, reason } => {
                write!(f, "Invalid match pattern '{}': {}", pattern, reason)
            }
            ConfigError::IoError { path, source } => {
                write!(f, "IO error on {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Metadata database FileBot should query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaDatabase {
    #[serde(rename = "TheMovieDB::TV")]
    TheMovieDbTv,
    #[serde(rename = "TheTVDB")]
    TheTvDb,
    #[serde(rename = "AniDB")]
    AniDb,
    #[serde(rename = "TheMovieDB")]
    TheMovieDb,
    #[serde(rename = "OMDb")]
    OmDb,
    #[serde(rename = "AcoustID")]
    AcoustId,
    #[serde(rename = "ID3")]
    Id3,
}

impl MediaDatabase {
    /// The name FileBot expects after `--db`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaDatabase::TheMovieDbTv => "TheMovieDB::TV",
            MediaDatabase::TheTvDb => "TheTVDB",
            MediaDatabase::AniDb => "AniDB",
            MediaDatabase::TheMovieDb => "TheMovieDB",
            MediaDatabase::OmDb => "OMDb",
            MediaDatabase::AcoustId => "AcoustID",
            MediaDatabase::Id3 => "ID3",
        }
    }
}

impl std::fmt::Display for MediaDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global fallbacks for category rules.
///
/// Both lists default to empty. No `match_patterns` means every file is
/// selected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
    #[serde(default)]
    pub match_patterns: Vec<String>,
}

/// Settings for one media category as written in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCategory {
    path: PathBuf,
    format: String,
    db: MediaDatabase,
    #[serde(default)]
    exclude_dirs: Option<Vec<String>>,
    #[serde(default)]
    match_patterns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawConfig {
    temp_dir: PathBuf,
    #[serde(default)]
    filebot: Option<PathBuf>,
    #[serde(default)]
    defaults: Defaults,
    #[serde(default)]
    categories: HashMap<String, RawCategory>,
}

/// Resolved settings for one media category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryConfig {
    /// Library root FileBot moves renamed files into.
    pub path: PathBuf,
    /// FileBot naming format.
    pub format: String,
    pub db: MediaDatabase,
    /// Directory names pruned from the walk, at any depth.
    pub exclude_dirs: Vec<String>,
    /// Case-insensitive file name globs. Empty matches every file.
    pub match_patterns: Vec<String>,
}

impl CategoryConfig {
    /// Compile the category's rules for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob pattern is invalid.
    pub fn compile(&self) -> Result<FileMatcher, ConfigError> {
        FileMatcher::new(&self.exclude_dirs, &self.match_patterns)
    }
}

/// Loaded, path-resolved configuration.
#[derive(Debug, Clone)]
pub struct QbotConfig {
    /// Root under which per-title staging directories are created.
    pub temp_dir: PathBuf,
    /// Explicit FileBot executable, overriding the `PATH` lookup.
    pub filebot: Option<PathBuf>,
    pub defaults: Defaults,
    pub categories: HashMap<String, CategoryConfig>,
}

impl QbotConfig {
    /// Load configuration from a JSON file and create `temp_dir`.
    ///
    /// # Errors
    ///
    /// Same as [`QbotConfig::read`], plus `ConfigError::IoError` if `temp_dir`
    /// cannot be created.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        fs::create_dir_all(&config.temp_dir).map_err(|e| ConfigError::IoError {
            path: config.temp_dir.clone(),
            source: e,
        })?;
        Ok(config)
    }

    /// Read configuration from a JSON file without creating `temp_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotJson` if the path lacks a `.json` extension,
    /// `ConfigError::ConfigNotFound` if it does not exist, and
    /// `ConfigError::ConfigInvalid` if parsing fails.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            return Err(ConfigError::NotJson(path.to_path_buf()));
        }

        let path = expand_path(path);
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path));
        }

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;

        let config = Self::from_json(&content)?;
        tracing::debug!(
            temp_dir = %config.temp_dir.display(),
            categories = config.categories.len(),
            "Loaded configuration from {}",
            path.display()
        );
        Ok(config)
    }

    /// Parse configuration text without touching the filesystem.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;

        let defaults = raw.defaults;
        let categories = raw
            .categories
            .into_iter()
            .map(|(name, cat)| {
                let resolved = CategoryConfig {
                    path: expand_path(&cat.path),
                    format: cat.format,
                    db: cat.db,
                    exclude_dirs: cat
                        .exclude_dirs
                        .unwrap_or_else(|| defaults.exclude_dirs.clone()),
                    match_patterns: cat
                        .match_patterns
                        .unwrap_or_else(|| defaults.match_patterns.clone()),
                };
                (name, resolved)
            })
            .collect();

        Ok(Self {
            temp_dir: expand_path(&raw.temp_dir),
            filebot: raw.filebot.as_deref().map(expand_path),
            defaults,
            categories,
        })
    }

    /// Settings for `name`, if the category is configured.
    pub fn category(&self, name: &str) -> Option<&CategoryConfig> {
        self.categories.get(name)
    }

    /// Append directory names to a category's exclusion list.
    ///
    /// Returns false if the category is not configured.
    pub fn extend_excludes(&mut self, name: &str, dirs: &[String]) -> bool {
        match self.categories.get_mut(name) {
            Some(cat) => {
                cat.exclude_dirs.extend(dirs.iter().cloned());
                true
            }
            None => false,
        }
    }
}

/// Expand a leading `~` using `HOME` and make the path absolute.
pub fn expand_path(path: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(rest),
            Err(_) => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };
    std::path::absolute(&expanded).unwrap_or(expanded)
}

/// Compiled exclusion and match rules for one category.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    exclude_dirs: HashSet<String>,
    patterns: Vec<Pattern>,
}

impl FileMatcher {
    /// Create a matcher. Patterns are lower-cased before compiling.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob pattern is invalid.
    pub fn new(exclude_dirs: &[String], match_patterns: &[String]) -> Result<Self, ConfigError> {
        let patterns = match_patterns
            .iter()
            .map(|pattern| {
                Pattern::new(&pattern.to_lowercase()).map_err(|e| {
                    ConfigError::InvalidGlobPattern {
                        pattern: pattern.clone(),
                        reason: e.msg.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exclude_dirs: exclude_dirs.iter().cloned().collect(),
            patterns,
        })
    }

    /// Whether a directory with this name is pruned from the walk.
    pub fn is_excluded_dir(&self, dir_name: &str) -> bool {
        self.exclude_dirs.contains(dir_name)
    }

    /// Whether a file name matches any pattern, ignoring case.
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        let name = file_name.to_lowercase();
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(&name, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "temp_dir": "/tmp/qbot-staging",
        "defaults": { "exclude_dirs": ["Extras"], "match_patterns": ["*.mkv"] },
        "categories": {
            "anime": {
                "path": "/media/anime",
                "format": "{n}/{s00e00}",
                "db": "AniDB",
                "exclude_dirs": ["SPs"],
                "match_patterns": []
            },
            "tv": { "path": "/media/tv", "format": "{n}/{s00e00}", "db": "TheMovieDB::TV" }
        }
    }"#;

    #[test]
    fn test_category_overrides_defaults() {
        let config = QbotConfig::from_json(SAMPLE).unwrap();
        let anime = config.category("anime").unwrap();

        assert_eq!(anime.db, MediaDatabase::AniDb);
        assert_eq!(anime.exclude_dirs, vec!["SPs".to_string()]);
        // An explicit empty list is kept, not replaced by defaults
        assert!(anime.match_patterns.is_empty());
    }

    #[test]
    fn test_missing_category_fields_inherit_defaults() {
        let config = QbotConfig::from_json(SAMPLE).unwrap();
        let tv = config.category("tv").unwrap();

        assert_eq!(tv.db, MediaDatabase::TheMovieDbTv);
        assert_eq!(tv.exclude_dirs, vec!["Extras".to_string()]);
        assert_eq!(tv.match_patterns, vec!["*.mkv".to_string()]);
        assert_eq!(tv.path, PathBuf::from("/media/tv"));
    }

    #[test]
    fn test_absent_defaults_select_every_file() {
        let config = QbotConfig::from_json(
            r#"{"temp_dir": "/tmp/x", "categories": {"movie": {"path": "/m", "format": "{n}", "db": "TheMovieDB"}}}"#,
        )
        .unwrap();
        let movie = config.category("movie").unwrap();

        assert!(movie.exclude_dirs.is_empty());
        assert!(movie.match_patterns.is_empty());
        assert!(config.filebot.is_none());

        let matcher = movie.compile().unwrap();
        assert!(matcher.matches_file_name("Movie (2020).mkv"));
        assert!(matcher.matches_file_name("Movie (2020).en.srt"));
    }

    #[test]
    fn test_defaults_without_patterns_are_inherited_as_empty() {
        let config = QbotConfig::from_json(
            r#"{"temp_dir": "/tmp/x", "defaults": {"exclude_dirs": ["Extras"]},
                "categories": {"tv": {"path": "/t", "format": "{n}", "db": "TheTVDB"}}}"#,
        )
        .unwrap();
        let tv = config.category("tv").unwrap();

        assert_eq!(tv.exclude_dirs, vec!["Extras".to_string()]);
        assert!(tv.match_patterns.is_empty());
    }

    #[test]
    fn test_unknown_database_is_invalid() {
        let result = QbotConfig::from_json(
            r#"{"temp_dir": "/tmp/x", "categories": {"tv": {"path": "/t", "format": "{n}", "db": "IMDb"}}}"#,
        );
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_missing_temp_dir_is_invalid() {
        let result = QbotConfig::from_json(r#"{"categories": {}}"#);
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_load_rejects_non_json_extension() {
        let result = QbotConfig::load(Path::new("config.toml"));
        assert!(matches!(result, Err(ConfigError::NotJson(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = QbotConfig::load(&temp_dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_creates_temp_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let staging = temp_dir.path().join("staging").join("nested");
        let config_path = temp_dir.path().join("qbot.json");
        let json = serde_json::json!({
            "temp_dir": staging,
            "filebot": "/opt/filebot/filebot.sh",
            "categories": {}
        });
        fs::write(&config_path, json.to_string()).expect("Failed to write config");

        let config = QbotConfig::load(&config_path).expect("Failed to load config");

        assert!(staging.is_dir());
        assert_eq!(config.temp_dir, staging);
        assert_eq!(config.filebot, Some(PathBuf::from("/opt/filebot/filebot.sh")));
    }

    #[test]
    fn test_read_leaves_temp_dir_alone() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let staging = temp_dir.path().join("staging");
        let config_path = temp_dir.path().join("qbot.json");
        let json = serde_json::json!({ "temp_dir": staging, "categories": {} });
        fs::write(&config_path, json.to_string()).expect("Failed to write config");

        let config = QbotConfig::read(&config_path).expect("Failed to read config");

        assert_eq!(config.temp_dir, staging);
        assert!(!staging.exists());
    }

    #[test]
    fn test_extend_excludes() {
        let mut config = QbotConfig::from_json(SAMPLE).unwrap();

        assert!(config.extend_excludes("anime", &["NCOP".to_string()]));
        assert!(!config.extend_excludes("music", &["x".to_string()]));
        assert_eq!(
            config.category("anime").unwrap().exclude_dirs,
            vec!["SPs".to_string(), "NCOP".to_string()]
        );
    }

    #[test]
    fn test_matcher_is_case_insensitive() {
        let matcher = FileMatcher::new(&[], &["*.MKV".to_string(), "*.mp4".to_string()]).unwrap();

        assert!(matcher.matches_file_name("Episode 01.mkv"));
        assert!(matcher.matches_file_name("Episode 01.MKV"));
        assert!(matcher.matches_file_name("movie.Mp4"));
        assert!(!matcher.matches_file_name("episode.ass"));
        assert!(!matcher.matches_file_name("mkv"));
    }

    #[test]
    fn test_matcher_without_patterns_matches_everything() {
        let matcher = FileMatcher::new(&[], &[]).unwrap();
        assert!(matcher.matches_file_name("notes.txt"));
        assert!(matcher.matches_file_name(".hidden"));
    }

    #[test]
    fn test_matcher_excluded_dirs_are_exact() {
        let matcher = FileMatcher::new(&["SPs".to_string()], &[]).unwrap();
        assert!(matcher.is_excluded_dir("SPs"));
        assert!(!matcher.is_excluded_dir("sps"));
        assert!(!matcher.is_excluded_dir("SPs2"));
    }

    #[test]
    fn test_invalid_glob_pattern_returns_error() {
        let result = FileMatcher::new(&[], &["[invalid".to_string()]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidGlobPattern { .. })
        ));
    }

    #[test]
    fn test_expand_path_home() {
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(
                expand_path(Path::new("~/qbot/logs")),
                PathBuf::from(home).join("qbot/logs")
            );
        }
        assert!(expand_path(Path::new("relative/dir")).is_absolute());
    }
}
