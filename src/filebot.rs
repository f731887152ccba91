//! Wrapper around the FileBot command-line renamer.
//!
//! qbot never identifies media itself. It builds a `filebot -rename` command
//! line from a [`RenameRequest`] and runs it, surfacing FileBot's output in the
//! log when the command fails.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

const EXECUTABLE_NAME: &str = "filebot";

/// What FileBot does with each matched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameAction {
    Move,
    Copy,
    Hardlink,
    Symlink,
    Test,
}

impl RenameAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenameAction::Move => "move",
            RenameAction::Copy => "copy",
            RenameAction::Hardlink => "hardlink",
            RenameAction::Symlink => "symlink",
            RenameAction::Test => "test",
        }
    }
}

/// How FileBot resolves an existing file at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Skip,
    Replace,
    Auto,
    Index,
    Fail,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Skip => "skip",
            ConflictPolicy::Replace => "replace",
            ConflictPolicy::Auto => "auto",
            ConflictPolicy::Index => "index",
            ConflictPolicy::Fail => "fail",
        }
    }
}

/// Parameters for one `filebot -rename` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRequest {
    /// Directory holding the files to rename (walked recursively).
    pub path: PathBuf,
    /// Library root renamed files are placed under.
    pub output: PathBuf,
    pub format: Option<String>,
    pub filter: Option<String>,
    /// Manual search query, usually the media title.
    pub query: Option<String>,
    /// Metadata database name, e.g. `AniDB`.
    pub db: Option<String>,
    pub action: Option<RenameAction>,
    pub conflict: Option<ConflictPolicy>,
    /// Accept less certain matches (`-non-strict`).
    pub non_strict: bool,
}

impl RenameRequest {
    /// A request with only the mandatory input and output paths set.
    pub fn new(path: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            output: output.into(),
            format: None,
            filter: None,
            query: None,
            db: None,
            action: None,
            conflict: None,
            non_strict: false,
        }
    }

    /// Command-line arguments following the executable.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-rename".to_string(),
            self.path.to_string_lossy().to_string(),
            "--output".to_string(),
            self.output.to_string_lossy().to_string(),
            "-r".to_string(),
        ];

        let mut push = |flag: &str, value: Option<&str>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                args.push(flag.to_string());
                args.push(value.to_string());
            }
        };
        push("--format", self.format.as_deref());
        push("--filter", self.filter.as_deref());
        push("--q", self.query.as_deref());
        push("--db", self.db.as_deref());
        push("--action", self.action.map(|a| a.as_str()));
        push("--conflict", self.conflict.map(|c| c.as_str()));

        if self.non_strict {
            args.push("-non-strict".to_string());
        }
        args
    }
}

/// Errors that can occur while locating or running FileBot.
#[derive(Debug)]
pub enum FileBotError {
    /// No executable was found on `PATH` or at the configured location.
    NotFound(PathBuf),
    /// The executable does not identify itself as FileBot.
    NotFileBot(PathBuf),
    /// The process could not be started.
    SpawnFailed {
        program: PathBuf,
        source: std::io::Error,
    },
    /// FileBot exited unsuccessfully. `code` is `None` when killed by a signal.
    CommandFailed { code: Option<i32> },
    /// `-version` printed something unexpected.
    UnexpectedVersionOutput(String),
}

impl std::fmt::Display for FileBotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(
                f,
                "FileBot executable not found: {}. Please install it or add it to PATH",
                path.display()
            ),
            Self::NotFileBot(path) => write!(
                f,
                "FileBot executable at {} is not valid or not working",
                path.display()
            ),
            Self::SpawnFailed { program, source } => {
                write!(f, "Failed to run {}: {}", program.display(), source)
            }
            Self::CommandFailed { code: Some(code) } => write!(
                f,
                "FileBot command failed with exit code {}. Check the logs for more details",
                code
            ),
            Self::CommandFailed { code: None } => write!(
                f,
                "FileBot command was terminated by a signal. Check the logs for more details"
            ),
            Self::UnexpectedVersionOutput(output) => {
                write!(f, "Unexpected output from filebot -version: {}", output)
            }
        }
    }
}

impl std::error::Error for FileBotError {}

/// Something that can carry out a [`RenameRequest`].
pub trait Renamer {
    fn rename(&self, request: &RenameRequest) -> Result<(), FileBotError>;
}

/// A located FileBot executable.
#[derive(Debug, Clone)]
pub struct FileBot {
    executable: PathBuf,
}

impl FileBot {
    /// Use a specific executable without checking it.
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Locate FileBot at `explicit`, or search `PATH` for `filebot`.
    ///
    /// # Errors
    ///
    /// Returns `FileBotError::NotFound` if no such file exists.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, FileBotError> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(Self::with_executable(path));
            }
            return Err(FileBotError::NotFound(path.to_path_buf()));
        }

        find_on_path(EXECUTABLE_NAME)
            .map(Self::with_executable)
            .ok_or_else(|| FileBotError::NotFound(PathBuf::from(EXECUTABLE_NAME)))
    }

    /// Locate FileBot and confirm it runs.
    pub fn locate_verified(explicit: Option<&Path>) -> Result<Self, FileBotError> {
        let filebot = Self::locate(explicit)?;
        filebot.verify()?;
        tracing::debug!(
            "FileBot is installed and working at: {}",
            filebot.executable.display()
        );
        Ok(filebot)
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Run `-version` and check the output names FileBot.
    pub fn verify(&self) -> Result<(), FileBotError> {
        match self.version_output() {
            Ok(stdout) if stdout.contains("FileBot") => Ok(()),
            Ok(_) | Err(FileBotError::CommandFailed { .. }) => {
                Err(FileBotError::NotFileBot(self.executable.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// The version string reported by `-version`, e.g. `5.1.3 (r9999)`.
    pub fn version(&self) -> Result<String, FileBotError> {
        parse_version(&self.version_output()?)
    }

    fn version_output(&self) -> Result<String, FileBotError> {
        let output = Command::new(&self.executable)
            .arg("-version")
            .output()
            .map_err(|e| FileBotError::SpawnFailed {
                program: self.executable.clone(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(FileBotError::CommandFailed {
                code: output.status.code(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// The full command line for `request`, quoted for a POSIX shell.
    pub fn command_line(&self, request: &RenameRequest) -> String {
        let mut parts = vec![self.executable.to_string_lossy().to_string()];
        parts.extend(request.to_args());
        shell_quote(&parts)
    }
}

impl Renamer for FileBot {
    fn rename(&self, request: &RenameRequest) -> Result<(), FileBotError> {
        tracing::info!("Running FileBot command: {}", self.command_line(request));

        let output = Command::new(&self.executable)
            .args(request.to_args())
            .output()
            .map_err(|e| FileBotError::SpawnFailed {
                program: self.executable.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let code = output.status.code();
            tracing::error!("FileBot command failed (exit {:?})", code);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stdout.trim().is_empty() {
                tracing::error!("\n=== stdout ===\n{}", stdout.trim_end());
            }
            if !stderr.trim().is_empty() {
                tracing::error!("\n=== stderr ===\n{}", stderr.trim_end());
            }
            return Err(FileBotError::CommandFailed { code });
        }

        tracing::debug!(
            "FileBot output:\n{}",
            String::from_utf8_lossy(&output.stdout).trim_end()
        );
        tracing::info!("FileBot successfully executed.");
        Ok(())
    }
}

static VERSION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^FileBot\s+(.+?)\s*$").expect("valid, static regex"));

/// Extract the version from `FileBot 5.1.3 (r9999)` style output.
pub fn parse_version(output: &str) -> Result<String, FileBotError> {
    output
        .lines()
        .find_map(|line| VERSION_LINE.captures(line.trim()))
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| FileBotError::UnexpectedVersionOutput(output.trim().to_string()))
}

/// Join arguments into a single command line, quoting like a POSIX shell.
pub fn shell_quote<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| quote_arg(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c);
    if !arg.is_empty() && arg.chars().all(is_safe) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r#"'"'"'"#))
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| candidate_names(name).into_iter().map(move |n| dir.join(n)))
        .find(|candidate| is_executable(candidate))
}

fn candidate_names(name: &str) -> Vec<String> {
    if cfg!(windows) {
        vec![format!("{}.exe", name), format!("{}.cmd", name), format!("{}.bat", name)]
    } else {
        vec![name.to_string()]
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_args() {
        let request = RenameRequest::new("/tmp/qbot/Show", "/media/tv");
        assert_eq!(
            request.to_args(),
            vec!["-rename", "/tmp/qbot/Show", "--output", "/media/tv", "-r"]
        );
    }

    #[test]
    fn test_full_args_in_order() {
        let request = RenameRequest {
            format: Some("{n}/{s00e00}".to_string()),
            filter: Some("episode < 10".to_string()),
            query: Some("Frieren".to_string()),
            db: Some("AniDB".to_string()),
            action: Some(RenameAction::Move),
            conflict: Some(ConflictPolicy::Replace),
            non_strict: true,
            ..RenameRequest::new("/in", "/out")
        };

        assert_eq!(
            request.to_args(),
            vec![
                "-rename",
                "/in",
                "--output",
                "/out",
                "-r",
                "--format",
                "{n}/{s00e00}",
                "--filter",
                "episode < 10",
                "--q",
                "Frieren",
                "--db",
                "AniDB",
                "--action",
                "move",
                "--conflict",
                "replace",
                "-non-strict",
            ]
        );
    }

    #[test]
    fn test_empty_optional_values_are_omitted() {
        let request = RenameRequest {
            filter: Some(String::new()),
            ..RenameRequest::new("/in", "/out")
        };
        assert!(!request.to_args().contains(&"--filter".to_string()));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(
            shell_quote(&["filebot", "-rename", "/tmp/My Show", "--q", "It's", ""]),
            r#"filebot -rename '/tmp/My Show' --q 'It'"'"'s' ''"#
        );
    }

    #[test]
    fn test_command_line() {
        let filebot = FileBot::with_executable("/usr/bin/filebot");
        let request = RenameRequest {
            format: Some("{n} ({y})".to_string()),
            ..RenameRequest::new("/in", "/out")
        };
        assert_eq!(
            filebot.command_line(&request),
            "/usr/bin/filebot -rename /in --output /out -r --format '{n} ({y})'"
        );
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(
            parse_version("FileBot 5.1.3 (r9999)\nJNA Native: 6.1.6\n").unwrap(),
            "5.1.3 (r9999)"
        );
        assert!(matches!(
            parse_version("Usage: something else"),
            Err(FileBotError::UnexpectedVersionOutput(_))
        ));
    }

    #[test]
    fn test_locate_missing_explicit_path() {
        let result = FileBot::locate(Some(Path::new("/non/existent/filebot")));
        assert!(matches!(result, Err(FileBotError::NotFound(_))));
    }

    #[test]
    fn test_spawn_failure() {
        let filebot = FileBot::with_executable("/non/existent/filebot");
        let result = filebot.rename(&RenameRequest::new("/in", "/out"));
        assert!(matches!(result, Err(FileBotError::SpawnFailed { .. })));
    }
}
