//! depsync CLI entry point
//!
//! Parses arguments, sets up logging, and runs the selected command. Errors
//! are rendered with suggestions through [`user_friendly_error`]; Ctrl-C
//! aborts the run with status 130 before the generated file is replaced.

use clap::Parser;
use depsync::cli;
use depsync::core::{DepsyncError, user_friendly_error};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    let config = cli.build_config();

    // RUST_LOG wins over --verbose/--quiet
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).without_time().init();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let result = tokio::select! {
        result = cli.execute_with_config(&config) => result,
        _ = tokio::signal::ctrl_c() => Err(DepsyncError::Interrupted.into()),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            let code = error_ctx.exit_code();
            error_ctx.display();
            std::process::exit(code);
        }
    }
}
