use std::path::PathBuf;

use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("could not determine the running artifact: {0}")]
pub struct ArtifactError(#[source] std::io::Error);

/// Path of the artifact the current process was started from.
///
/// # Errors
/// Returns an error when the platform cannot report the executable path.
pub fn current_artifact() -> Result<PathBuf, ArtifactError> {
    let exe = std::env::current_exe().map_err(ArtifactError)?;
    let exe = strip_deleted_suffix(exe);
    Ok(std::fs::canonicalize(&exe).unwrap_or(exe))
}

// After the executable is replaced on Linux, /proc/self/exe points at the
// unlinked inode and the reported path gains a " (deleted)" suffix.
fn strip_deleted_suffix(path: PathBuf) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_suffix(" (deleted)")) {
        Some(stripped) => {
            debug!("Using replaced artifact path {stripped}");
            PathBuf::from(stripped)
        }
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{current_artifact, strip_deleted_suffix};

    #[test]
    fn current_artifact_points_at_existing_file() {
        let artifact = current_artifact().expect("test binary path should resolve");
        assert!(artifact.is_file());
        assert!(artifact.is_absolute());
    }

    #[test]
    fn deleted_suffix_is_removed() {
        assert_eq!(
            strip_deleted_suffix(PathBuf::from("/opt/app/bin/app (deleted)")),
            PathBuf::from("/opt/app/bin/app")
        );
        assert_eq!(
            strip_deleted_suffix(PathBuf::from("/opt/app/bin/app")),
            PathBuf::from("/opt/app/bin/app")
        );
    }
}
