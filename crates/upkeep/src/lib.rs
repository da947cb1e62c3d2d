//! Self-update orchestration for a packaged artifact.
//!
//! [`Updater`] composes the building blocks from `upkeep-core` into
//! asynchronous operations that run on an owned or injected [`WorkerPool`].

mod error;
pub mod logging;
mod pool;
mod settings;
mod updater;

pub use error::{BuildError, UpdaterError};
pub use pool::{UpdateTask, WorkerPool};
pub use settings::{DEFAULT_VERSION_ENTRY, UpdaterSettings};
pub use updater::Updater;

pub use upkeep_core::{DownloadProgress, INVALID, NOT_FOUND, ProgressListener, Version};
pub use upkeep_platform::current_artifact;
