use std::{io::Write, path::Path, time::Duration};

use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::{
    archiver::{build_zip_archive, ArchiverError},
    config::{DeployConfig, Rewrite},
    credential::{CredentialError, CredentialProvider},
    hosting::{HostingApi, HostingError, Release},
};

/// Deployment progress. Stages only ever advance.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    /// Nothing was done yet.
    #[display(fmt = "start")]
    Start,

    /// Bearer credential was obtained.
    #[display(fmt = "token acquired")]
    TokenAcquired,

    /// Build directory was archived.
    #[display(fmt = "archive built")]
    ArchiveBuilt,

    /// Release exists on the hosting side, awaiting its archive.
    #[display(fmt = "release created")]
    ReleaseCreated,

    /// Archive was accepted.
    #[display(fmt = "uploaded")]
    Uploaded,
}

/// Deployment errors, tagged by the failed stage.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DeployError {
    /// No credential could be obtained.
    #[display(fmt = "failed to get hosting token: {}", _0)]
    Credential(CredentialError),

    /// Build directory could not be archived.
    #[display(fmt = "unable to create zip archive: {}", _0)]
    Archive(ArchiverError),

    /// Build directory has no files and empty releases are disallowed.
    #[display(fmt = "build directory {} contains no files", build_dir)]
    #[from(ignore)]
    EmptyArchive {
        /// Archived build directory.
        build_dir: String,
    },

    /// Release declaration was rejected.
    #[display(fmt = "failed to create release: {}", _0)]
    CreateRelease(HostingError),

    /// Archive upload was rejected. The release is left unfinished.
    #[display(fmt = "upload failed for release {}: {}", release, source)]
    #[from(ignore)]
    Upload {
        /// Name of the release left without an archive.
        release: String,

        /// Underlying hosting error.
        source: HostingError,
    },
}

impl DeployError {
    /// Last stage completed before the failure.
    pub fn stage(&self) -> Stage {
        match self {
            DeployError::Credential(_) => Stage::Start,
            DeployError::Archive(_) | DeployError::EmptyArchive { .. } => Stage::TokenAcquired,
            DeployError::CreateRelease(_) => Stage::ArchiveBuilt,
            DeployError::Upload { .. } => Stage::ReleaseCreated,
        }
    }
}

/// Result of a completed deployment.
#[derive(Debug)]
pub(crate) struct DeployOutcome {
    /// Created release.
    pub release: Release,

    /// Count of files in the uploaded archive.
    pub entries: usize,

    /// Uploaded archive size, in bytes.
    pub archive_size: usize,
}

/// Single deployment of a build directory to a hosting site.
pub(crate) struct Deployment<'a> {
    /// Hosting site identifier.
    site_id: &'a str,

    /// Directory with a pre-built static site.
    build_dir: &'a Path,

    /// Routing rules attached to the release.
    rewrites: &'a [Rewrite],

    /// File name reported for the uploaded archive.
    file_name: &'a str,

    /// Allow releasing an archive without any files.
    allow_empty: bool,
}

impl<'a> Deployment<'a> {
    /// Create a deployment described by `config`.
    pub fn new(config: &'a DeployConfig) -> Self {
        Self {
            site_id: &config.site_id,
            build_dir: &config.build_dir,
            rewrites: &config.rewrites,
            file_name: &config.archive.file_name,
            allow_empty: config.archive.allow_empty,
        }
    }

    /// Run every deployment stage in order, stopping at the first failure.
    ///
    /// Confirmation lines are written to `out`, the spinner only shows
    /// transient progress. Failures are not compensated: a release created
    /// before a failed upload stays on the hosting side.
    pub fn run(
        &self,
        credentials: &dyn CredentialProvider,
        hosting: &dyn HostingApi,
        progress: &ProgressBar,
        out: &mut dyn Write,
    ) -> Result<DeployOutcome, DeployError> {
        progress.enable_steady_tick(Duration::from_millis(150));
        progress.set_message("Acquiring hosting token...");

        let token = credentials.acquire()?;
        completed(Stage::TokenAcquired);

        progress.set_message("Archiving...");

        let archive = build_zip_archive(self.build_dir)?;

        for path in archive.skipped() {
            report(
                out,
                progress,
                &format!("File {} contains non-unicode symbols in path", path.display()),
            );
        }

        if archive.is_empty() && !self.allow_empty {
            return Err(DeployError::EmptyArchive {
                build_dir: self.build_dir.display().to_string(),
            });
        }

        let entries = archive.entries();
        let archive_size = archive.bytes().len();

        info!(
            entries,
            size = archive_size,
            digest = %archive.digest(),
            "archive ready"
        );
        completed(Stage::ArchiveBuilt);

        progress.set_message("Creating release...");

        let release = hosting
            .create_release(&token, self.site_id, self.rewrites)
            .map_err(DeployError::CreateRelease)?;

        report(out, progress, &format!("Release created: {}", release.name));
        info!(release = %release.name, upload_url = %release.upload_url, "release created");
        completed(Stage::ReleaseCreated);

        progress.set_message("Uploading archive...");

        hosting
            .upload_archive(&release.upload_url, self.file_name, archive)
            .map_err(|source| DeployError::Upload {
                release: release.name.clone(),
                source,
            })?;

        completed(Stage::Uploaded);
        progress.finish_and_clear();
        report(out, progress, "Deployment successful!");

        Ok(DeployOutcome {
            release,
            entries,
            archive_size,
        })
    }
}

/// Log completion of a deployment stage.
fn completed(stage: Stage) {
    info!(%stage, "deployment stage completed");
}

/// Print a confirmation line above the spinner.
///
/// The deployment itself already happened, so a closed output is only logged.
fn report(out: &mut dyn Write, progress: &ProgressBar, line: &str) {
    if let Err(e) = progress.suspend(|| writeln!(out, "{line}")) {
        warn!(%e, line, "unable to print confirmation");
    }
}
