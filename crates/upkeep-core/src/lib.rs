//! Building blocks for self-updating a packaged artifact.
//!
//! - Dotted numeric version parsing and ordering.
//! - Reading the embedded version marker from a zip archive.
//! - Fetching the published version marker over HTTP.
//! - Deciding whether an update is available.
//! - Streaming downloads with progress reporting.

mod archive;
mod checker;
mod download;
mod remote;
mod version;

/// Zip version marker reader.
pub use archive::{ArchiveError, read_archive_version};
/// Local/remote version comparison with fail-open rules.
pub use checker::{UpdateChecker, is_newer_available};
/// Progress-tracked HTTP download.
pub use download::{
    DOWNLOAD_CHUNK_SIZE, DownloadError, DownloadProgress, ProgressListener, download_with_progress,
};
/// Remote version marker fetch.
pub use remote::{FetchError, fetch_latest_version};
/// Version model and ordering.
pub use version::{Version, VersionParseError, compare_versions};

/// No usable version could be determined locally.
pub const NOT_FOUND: &str = "NOT FOUND";

/// The version endpoint reports that it has no valid version.
pub const INVALID: &str = "UNGÜLTIG";

/// Decode the first line of `bytes` as lossy UTF-8, without its line ending.
pub(crate) fn first_line(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(bytes.len());
    let line = bytes[..end].strip_suffix(b"\r").unwrap_or(&bytes[..end]);
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::first_line;

    #[test]
    fn first_line_strips_line_endings() {
        assert_eq!(first_line(b"1.0.0\nrest"), "1.0.0");
        assert_eq!(first_line(b"1.0.0\r\nrest"), "1.0.0");
        assert_eq!(first_line(b"1.0.0"), "1.0.0");
        assert_eq!(first_line(b""), "");
        assert_eq!(first_line(b"\n2.0.0"), "");
    }

    #[test]
    fn first_line_decodes_utf8() {
        assert_eq!(first_line("UNGÜLTIG\n".as_bytes()), super::INVALID);
    }
}
