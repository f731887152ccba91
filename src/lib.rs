//! qbot - stage downloaded media and rename it into a library with FileBot
//!
//! This library selects media files under a download directory using per-category
//! exclusion and match rules, stages them into a temporary working directory while
//! preserving their layout, and hands them to the FileBot command-line renamer.

pub mod cli;
pub mod config;
pub mod extra_args;
pub mod filebot;
pub mod logging;
pub mod output;
pub mod qbot;
pub mod scanner;
pub mod stager;

pub use config::{CategoryConfig, ConfigError, FileMatcher, MediaDatabase, QbotConfig};
pub use extra_args::ExtraArguments;
pub use filebot::{FileBot, FileBotError, RenameRequest, Renamer};
pub use qbot::{QBot, QbotError, RenameJob, RenameOutcome};

pub use cli::{Cli, MediaCategory, run_cli};
