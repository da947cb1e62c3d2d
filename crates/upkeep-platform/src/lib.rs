mod artifact;
mod paths;

pub use artifact::{ArtifactError, current_artifact};
pub use paths::{AppPaths, AppPathsError};
