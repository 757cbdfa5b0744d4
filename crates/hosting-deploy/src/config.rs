use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use common::config::Logging;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default hosting API root.
pub fn default_api_url() -> String {
    String::from("https://firebasehosting.googleapis.com/v1beta1")
}

fn default_site_id() -> String {
    String::from("saeedkhanportfolio")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build/web")
}

fn default_rewrites() -> Vec<Rewrite> {
    vec![Rewrite {
        source: String::from("**"),
        destination: String::from("/index.html"),
    }]
}

/// Routing rule that serves `destination` for requests matching `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewrite {
    /// Glob pattern matched against the request path.
    pub source: String,

    /// Document served for matching requests.
    pub destination: String,
}

/// External CLI helper used to obtain a bearer token.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialHelper {
    /// Helper program name or path.
    pub program: String,

    /// Arguments that make the helper print a reusable token.
    pub args: Vec<String>,
}

impl Default for CredentialHelper {
    fn default() -> Self {
        Self {
            program: String::from("firebase"),
            args: vec![String::from("login:ci")],
        }
    }
}

/// Hosting provider CLI used by the `delegate` subcommand.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostingCli {
    /// CLI program name or path.
    pub program: String,

    /// Arguments placed before the deploy arguments.
    pub args: Vec<String>,
}

impl Default for HostingCli {
    fn default() -> Self {
        Self {
            program: String::from("firebase"),
            args: Vec::new(),
        }
    }
}

/// Archive packaging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    /// File name reported for the uploaded archive.
    pub file_name: String,

    /// Allow releasing an archive without any files.
    pub allow_empty: bool,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            file_name: String::from("site.zip"),
            allow_empty: true,
        }
    }
}

/// Deployment configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    /// Hosting site identifier.
    #[serde(default = "default_site_id")]
    pub site_id: String,

    /// Directory with a pre-built static site.
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// Hosting API root.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Pre-acquired token. The credential helper is skipped when set.
    #[serde(default)]
    pub token: Option<String>,

    /// Credential helper invocation.
    #[serde(default)]
    pub credential_helper: CredentialHelper,

    /// Hosting provider CLI invocation.
    #[serde(default)]
    pub hosting_cli: HostingCli,

    /// Routing rules attached to each release.
    #[serde(default = "default_rewrites")]
    pub rewrites: Vec<Rewrite>,

    /// Archive packaging settings.
    #[serde(default)]
    pub archive: ArchiveSettings,

    /// HTTP request timeout, in seconds. Requests never time out if unset.
    #[serde(default)]
    pub request_timeout: Option<u64>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: Logging,
}

impl DeployConfig {
    /// Create new deployment config using the provided configuration file
    /// and environment variables. A missing file leaves every key at its
    /// default.
    ///
    /// Environment variables are prefixed with `DEPLOY_`, nested keys are
    /// separated with `__` (for example, `DEPLOY_ARCHIVE__ALLOW_EMPTY`).
    /// See [`Env`] for more details.
    pub fn new(path: &Path) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("DEPLOY_").split("__"))
            .extract()
    }

    /// Configured request timeout.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout.map(Duration::from_secs)
    }
}
