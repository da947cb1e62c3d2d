use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::{NOT_FOUND, first_line};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read archive {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("failed to read entry {entry} in {path}: {source}")]
    Entry {
        path: PathBuf,
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read the version stored as the first line of `entry_name` inside a zip
/// archive.
///
/// Returns [`NOT_FOUND`] when the archive does not exist or has no such entry.
/// This performs blocking file IO.
///
/// # Errors
/// Returns an error when the archive exists but cannot be opened or read.
pub fn read_archive_version(archive: &Path, entry_name: &str) -> Result<String, ArchiveError> {
    if !archive.exists() {
        info!("Archive not found: {}", archive.display());
        return Ok(NOT_FOUND.to_string());
    }

    let file = std::fs::File::open(archive).map_err(|source| ArchiveError::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(|source| ArchiveError::Zip {
        path: archive.to_path_buf(),
        source,
    })?;

    let entry = match zip.by_name(entry_name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            debug!("No entry {entry_name} in {}", archive.display());
            return Ok(NOT_FOUND.to_string());
        }
        Err(source) => {
            return Err(ArchiveError::Zip {
                path: archive.to_path_buf(),
                source,
            });
        }
    };

    let mut line = Vec::new();
    BufReader::new(entry)
        .read_until(b'\n', &mut line)
        .map_err(|source| ArchiveError::Entry {
            path: archive.to_path_buf(),
            entry: entry_name.to_string(),
            source,
        })?;

    let version = first_line(&line);
    debug!("Read version {version:?} from {}", archive.display());
    Ok(version)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::path::Path;

    use super::{ArchiveError, read_archive_version};
    use crate::NOT_FOUND;

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).expect("archive file should be created");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            writer
                .start_file(*name, options)
                .expect("entry should be started");
            writer.write_all(content).expect("entry should be written");
        }
        writer.finish().expect("archive should be finalized");
    }

    #[test]
    fn missing_archive_reports_not_found() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let version = read_archive_version(&temp.path().join("absent.zip"), "version.txt")
            .expect("missing archive should not fail");
        assert_eq!(version, NOT_FOUND);
    }

    #[test]
    fn missing_entry_reports_not_found() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let archive = temp.path().join("app.zip");
        write_archive(&archive, &[("other.txt", b"1.0.0\n")]);

        let version =
            read_archive_version(&archive, "version.txt").expect("missing entry should not fail");
        assert_eq!(version, NOT_FOUND);
    }

    #[test]
    fn reads_first_line_of_entry() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let archive = temp.path().join("app.zip");
        write_archive(
            &archive,
            &[
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
                ("META-INF/version.txt", b"2.0.0\r\nbuilt by ci\n"),
            ],
        );

        let version = read_archive_version(&archive, "META-INF/version.txt")
            .expect("version entry should be read");
        assert_eq!(version, "2.0.0");
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let archive = temp.path().join("broken.zip");
        std::fs::write(&archive, b"definitely not a zip").expect("file should be written");

        let result = read_archive_version(&archive, "version.txt");
        assert!(matches!(result, Err(ArchiveError::Zip { .. })));
    }
}
