//! Operator CLI for the build worker
//!
//! Small diagnostic commands usable on a worker host:
//! - `check-config`: Validate the environment-sourced configuration
//! - `resolve-host`: Show the registry prefix derived from the container host

use anyhow::Result;
use clap::{Parser, Subcommand};

use fnforge::infrastructure::Config;
use fnforge::registry::ContainerHostResolver;

/// CLI arguments for fnforge
#[derive(Parser, Debug)]
#[command(name = "fnforge")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the environment-sourced configuration
    CheckConfig,

    /// Resolve the container registry prefix used for image tags
    ResolveHost,
}

/// Parse and execute CLI arguments
///
/// # Errors
///
/// Returns an error when a required configuration variable is missing.
pub async fn run() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env();

    match args.command {
        Command::CheckConfig => {
            config.validate()?;
            println!("configuration ok");
            println!("provider url: {}", config.provider_base_url());
            match &config.container_host {
                Some(host) => println!("container host: {host}"),
                None => println!("container host: (not set, images tag without a registry)"),
            }
        }
        Command::ResolveHost => {
            let resolver = ContainerHostResolver::new(config.container_host.clone());
            let prefix = resolver.container_host().await;
            if prefix.is_empty() {
                println!("(no registry prefix)");
            } else {
                println!("{prefix}");
            }
        }
    }

    Ok(())
}
