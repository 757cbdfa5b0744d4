use std::{
    io::{self, Write},
    path::Path,
};

use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use tempfile::{NamedTempFile, PersistError};
use tracing::info;

use crate::{
    archiver::{build_zip_archive, ArchiverError},
    commands::Package,
    config::DeployConfig,
};

/// `package` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum PackageError {
    /// IO-related error.
    Io(io::Error),

    /// Zip archiver error.
    #[display(fmt = "unable to create zip archive: {}", _0)]
    Archiver(ArchiverError),

    /// Unable to move the temporary archive onto its final location.
    PersistError(PersistError),
}

/// Packaging flow entrypoint.
///
/// The archive is the same one `deploy` would upload. It is written next to
/// `output` first, then moved into place.
pub(crate) fn package(
    Package { build_dir, output }: Package,
    config: DeployConfig,
    out: &mut dyn Write,
) -> Result<(), PackageError> {
    let build_dir = build_dir.unwrap_or(config.build_dir);

    let progress = ProgressBar::new_spinner();
    progress.set_message("Archiving...");

    let archive = build_zip_archive(&build_dir)?;

    progress.finish_and_clear();

    for path in archive.skipped() {
        writeln!(
            out,
            "File {} contains non-unicode symbols in path",
            path.display()
        )?;
    }

    let parent = output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(archive.bytes())?;
    file.persist(&output)?;

    info!(
        entries = archive.entries(),
        digest = %archive.digest(),
        output = %output.display(),
        "archive written"
    );

    writeln!(
        out,
        "Packaged {} files into {}",
        archive.entries(),
        output.display()
    )?;

    Ok(())
}
