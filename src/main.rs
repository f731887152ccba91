use clap::Parser;
use qbot::cli::{Cli, run_cli};
use qbot::config::expand_path;
use qbot::logging;
use qbot::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_dir = expand_path(&cli.log);
    match logging::init(&log_dir, cli.debug) {
        Ok(log_path) => tracing::debug!("Logging to {}", log_path.display()),
        Err(e) => OutputFormatter::warning(&format!("File logging disabled: {}", e)),
    }

    match run_cli(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            OutputFormatter::error(&e);
            ExitCode::FAILURE
        }
    }
}
