/// `delegate` subcommand.
mod delegate;

/// `deploy` subcommand.
mod deploy;

/// `package` subcommand.
mod package;

pub(crate) use delegate::delegate;
pub(crate) use deploy::deploy;
pub(crate) use package::package;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI configuration.
#[derive(Parser)]
#[command(about)]
pub(crate) struct Cli {
    /// Configuration file path.
    #[arg(short, long, default_value = "Deploy.toml")]
    pub config_file: PathBuf,

    /// Selected subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Supported subcommands.
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Package the build directory and release it to the hosting site.
    Deploy(Deploy),

    /// Package the build directory into a local archive without deploying it.
    Package(Package),

    /// Deploy through the hosting provider's own CLI instead of the REST API.
    Delegate(Delegate),
}

/// `deploy` subcommand configuration.
#[derive(Args)]
pub struct Deploy {
    /// Hosting site identifier.
    #[arg(short, long)]
    site: Option<String>,

    /// Directory with a pre-built static site.
    #[arg(short, long)]
    build_dir: Option<PathBuf>,

    /// Custom hosting API path.
    #[arg(short, long)]
    api_url: Option<String>,
}

/// `package` subcommand configuration.
#[derive(Args)]
pub struct Package {
    /// Directory with a pre-built static site.
    #[arg(short, long)]
    build_dir: Option<PathBuf>,

    /// Path where to write the archive.
    #[arg(short, long, default_value = "site.zip")]
    output: PathBuf,
}

/// `delegate` subcommand configuration.
#[derive(Args)]
pub struct Delegate {
    /// Hosting site identifier.
    #[arg(short, long)]
    site: Option<String>,

    /// Project directory the hosting CLI runs in.
    #[arg(short, long, default_value = ".")]
    project_dir: PathBuf,
}
