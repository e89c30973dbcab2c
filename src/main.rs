//! Rate Compare - command-line front end
//!
//! Loads rate files, runs one comparison and prints or exports the result.

mod app;
mod cli;

use clap::Parser;
use cli::Cli;
use rate_compare::{CompareError, ErrorKind};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    match app::execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = err.downcast_ref::<CompareError>().map(CompareError::kind);
            error!(error = %err, "run failed");
            eprintln!("❌ Error while processing: {err:#}");
            match kind {
                Some(ErrorKind::Configuration) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
