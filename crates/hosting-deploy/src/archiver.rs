use std::{
    fs::File,
    io::{self, Cursor},
    path::{Path, PathBuf, StripPrefixError},
};

use common::hash;
use derive_more::{Display, Error, From};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Errors that may occur during the archive creation process.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ArchiverError {
    /// [`zip`]-crate specific error.
    Zip(zip::result::ZipError),

    /// [`walkdir`]-crate specific error.
    WalkDir(walkdir::Error),

    /// IO error.
    Io(io::Error),

    /// Unable to strip build directory prefix from path.
    StripPrefix(StripPrefixError),
}

/// In-memory ZIP archive of a build directory.
pub(crate) struct Archive {
    /// Complete archive contents, including the central directory.
    bytes: Vec<u8>,

    /// Count of file entries written into the archive.
    entries: usize,

    /// Files left out because their relative path is not valid UTF-8.
    skipped: Vec<PathBuf>,
}

impl Archive {
    /// Archive contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the archive, returning its contents.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Count of file entries.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Files left out because their path has non-unicode symbols.
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    /// Whether the archive contains no file entries.
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Hex-encoded BLAKE2b-256 digest of the archive contents.
    pub fn digest(&self) -> String {
        hash::blake2_hex(&self.bytes)
    }
}

/// Archive every regular file below `root` into an in-memory ZIP buffer.
///
/// Entry names are paths relative to `root`, joined with `/`. Directories
/// themselves are not stored. A missing or empty `root` produces an archive
/// without entries, leaving the policy decision to the caller. Files with
/// non-unicode relative paths are skipped and listed in [`Archive::skipped`].
pub(crate) fn build_zip_archive(root: &Path) -> Result<Archive, ArchiverError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = 0;
    let mut skipped = Vec::new();

    if root.exists() {
        let mut walk = walk_build_directory(root);

        while let Some(entry) = walk.next().transpose()? {
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root)?;

            let Some(name) = entry_name(relative) else {
                warn!(path = %entry.path().display(), "skipping file with non-unicode path");
                skipped.push(entry.path().to_path_buf());
                continue;
            };

            if name.is_empty() {
                continue;
            }

            debug!(%name, "adding archive entry");
            writer.start_file(name, options)?;
            io::copy(&mut File::open(entry.path())?, &mut writer)?;
            entries += 1;
        }
    }

    if entries == 0 {
        warn!(root = %root.display(), "build directory contains no files");
    }

    let bytes = writer.finish()?.into_inner();

    Ok(Archive {
        bytes,
        entries,
        skipped,
    })
}

/// Recursively iterate over the build directory, following symbolic links.
fn walk_build_directory(root: &Path) -> impl Iterator<Item = Result<DirEntry, walkdir::Error>> {
    WalkDir::new(root).follow_links(true).into_iter()
}

/// Convert a relative path into a ZIP entry name.
///
/// Returns [`None`] if any path component is not valid UTF-8.
fn entry_name(relative: &Path) -> Option<String> {
    let components = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;

    Some(components.join("/"))
}
