//! # Hosting deploy
//!
//! Releases a pre-built static site to a hosting provider.
//!
//! A deployment obtains a bearer token from the provider's CLI helper,
//! packages the build directory into an in-memory ZIP archive, declares a
//! new release with single-page-application routing rules and uploads the
//! archive to the URL returned for that release. Every stage runs once and
//! the first failure stops the deployment.
//!
//! Alternatively, the whole deployment can be delegated to the provider's
//! own CLI.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::io;

use clap::Parser;
use commands::{Cli, Commands};
use config::DeployConfig;

/// Build directory archiving utilities.
mod archiver;

/// CLI subcommands.
mod commands;

/// Deployment configuration.
mod config;

/// Bearer credential acquisition.
mod credential;

/// External helper programs.
mod helper;

/// Hosting REST API client.
mod hosting;

/// Deployment stages.
mod pipeline;

/// CLI entrypoint.
fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let config = DeployConfig::new(&cli.config_file)?;

    common::logging::init(&config.logging);

    let mut out = io::stdout();

    match cli.command {
        Commands::Deploy(args) => commands::deploy(args, config, &mut out)?,
        Commands::Package(args) => commands::package(args, config, &mut out)?,
        Commands::Delegate(args) => commands::delegate(args, config, &mut out)?,
    }

    Ok(())
}
