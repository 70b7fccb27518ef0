//! Packaging of a finished download directory into a zip archive

use crate::error::{ArchiveError, Error, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Default archive file name
pub const DEFAULT_ARCHIVE_NAME: &str = "dataset.zip";

/// Zip archive writer for dataset directories
pub struct Archiver;

impl Archiver {
    /// Compress every file under `source_dir` into `destination_dir/archive_name`
    ///
    /// Entry names are paths relative to `source_dir` with `/` separators; directories
    /// get no entries of their own. The archive is written under a `.partial` name and
    /// renamed once complete. `source_dir` is only removed after that rename, so a
    /// failed archive never costs the downloaded data. `destination_dir` must exist.
    ///
    /// Returns the final archive path.
    pub fn package(
        source_dir: &Path,
        destination_dir: &Path,
        archive_name: &str,
        remove_source: bool,
    ) -> Result<PathBuf> {
        let archive_path = destination_dir.join(archive_name);
        let partial_path = destination_dir.join(format!("{}.partial", archive_name));

        debug!(?source_dir, ?archive_path, "packaging directory");

        let entries = match Self::write_archive(source_dir, &partial_path) {
            Ok(entries) => entries,
            Err(e) => {
                if let Err(cleanup) = std::fs::remove_file(&partial_path)
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(?partial_path, error = %cleanup, "failed to remove partial archive");
                }
                return Err(e);
            }
        };

        std::fs::rename(&partial_path, &archive_path).map_err(|e| {
            Error::Archive(ArchiveError::Write {
                path: archive_path.clone(),
                reason: format!("failed to move archive into place: {}", e),
            })
        })?;

        info!(?archive_path, entries, "archive written");

        if remove_source {
            std::fs::remove_dir_all(source_dir).map_err(|e| {
                Error::Archive(ArchiveError::Cleanup {
                    path: source_dir.to_path_buf(),
                    source: e,
                })
            })?;
            debug!(?source_dir, "removed source directory");
        }

        Ok(archive_path)
    }

    /// [`Archiver::package`] on the blocking thread pool
    pub async fn package_async(
        source_dir: PathBuf,
        destination_dir: PathBuf,
        archive_name: String,
        remove_source: bool,
    ) -> Result<PathBuf> {
        let archive_path = destination_dir.join(&archive_name);
        tokio::task::spawn_blocking(move || {
            Self::package(&source_dir, &destination_dir, &archive_name, remove_source)
        })
        .await
        .map_err(|e| {
            Error::Archive(ArchiveError::Write {
                path: archive_path,
                reason: format!("archive task panicked: {}", e),
            })
        })?
    }

    /// Write all files under `source_dir` to a new zip at `archive_path`
    fn write_archive(source_dir: &Path, archive_path: &Path) -> Result<usize> {
        let write_err = |reason: String| {
            Error::Archive(ArchiveError::Write {
                path: archive_path.to_path_buf(),
                reason,
            })
        };

        let file = File::create(archive_path).map_err(|e| {
            Error::Archive(ArchiveError::Create {
                path: archive_path.to_path_buf(),
                reason: e.to_string(),
            })
        })?;
        let mut writer = ZipWriter::new(file);
        let mut entries = 0;

        for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| write_err(format!("failed to walk source: {}", e)))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let name = Self::entry_name(source_dir, entry.path())?;
            let size = entry
                .metadata()
                .map_err(|e| write_err(format!("failed to stat {}: {}", entry.path().display(), e)))?
                .len();

            let options = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .large_file(size >= u64::from(u32::MAX));

            writer
                .start_file(name.as_str(), options)
                .map_err(|e| write_err(format!("failed to add entry {}: {}", name, e)))?;
            let mut input = File::open(entry.path())
                .map_err(|e| write_err(format!("failed to open {}: {}", entry.path().display(), e)))?;
            std::io::copy(&mut input, &mut writer)
                .map_err(|e| write_err(format!("failed to compress {}: {}", name, e)))?;

            entries += 1;
        }

        let mut file = writer
            .finish()
            .map_err(|e| write_err(format!("failed to finalize archive: {}", e)))?;
        file.flush()
            .and_then(|_| file.sync_all())
            .map_err(|e| write_err(format!("failed to sync archive: {}", e)))?;

        Ok(entries)
    }

    /// Relative, `/`-separated entry name for `path` under `root`
    fn entry_name(root: &Path, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(root).map_err(|_| {
            Error::Archive(ArchiveError::Write {
                path: path.to_path_buf(),
                reason: "entry outside source directory".to_string(),
            })
        })?;

        Ok(relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"))
    }
}
