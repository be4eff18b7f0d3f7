//! fnforge - operator CLI for the function build worker
//!
//! Diagnostic commands for a worker host:
//!
//! - `fnforge check-config` - Validate the environment-sourced configuration
//! - `fnforge resolve-host` - Show the registry prefix used for image tags

use std::process::ExitCode;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    fnforge::infrastructure::init_logging("info");

    match cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
