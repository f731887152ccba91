//! Output formatting and styling module.
//!
//! Provides user-facing console output (colored status lines, the staging
//! progress bar and the dry-run plan). Diagnostic detail goes through
//! `tracing` instead; see [`crate::logging`].

use crate::qbot::{RenameOutcome, RenamePlan};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for staging `total` files.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use qbot::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(12);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints what a dry run would have done.
    pub fn dry_run_plan(plan: &RenamePlan, command_line: &str) {
        Self::header("Matched files");
        for file in &plan.files {
            println!(" - {}", file.display());
        }

        if !plan.moves.is_empty() {
            Self::header("Staging");
            for planned in &plan.moves {
                println!(
                    " - {}\n   → {}",
                    planned.source.display(),
                    planned.destination.display().to_string().green()
                );
            }
        }

        Self::header("FileBot command");
        println!("{}", command_line);

        println!();
        Self::dry_run_notice(&format!(
            "{} {} matched. No files were modified.",
            plan.files.len(),
            if plan.files.len() == 1 { "file" } else { "files" }
        ));
    }

    /// Prints the final status line for a completed run.
    pub fn outcome(outcome: &RenameOutcome) {
        match outcome {
            RenameOutcome::NoFiles => Self::warning("No matching media files found."),
            RenameOutcome::Renamed {
                file_count,
                output,
                ..
            } => Self::success(&format!(
                "Renamed {} {} into {}",
                file_count,
                if *file_count == 1 { "file" } else { "files" },
                output.display()
            )),
            // The plan is printed separately because it needs the command line.
            RenameOutcome::DryRun(_) => {}
        }
    }
}
