use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use upkeep_core::{
    NOT_FOUND, ProgressListener, UpdateChecker, download_with_progress, fetch_latest_version,
    read_archive_version,
};

use crate::error::{BuildError, UpdaterError};
use crate::pool::{UpdateTask, WorkerPool};
use crate::settings::{DEFAULT_VERSION_ENTRY, UpdaterSettings};

/// Checks for and downloads new versions of a packaged artifact.
///
/// Every operation runs on the updater's [`WorkerPool`] and returns an
/// [`UpdateTask`]. Failure handling differs per operation:
/// - [`get_version`](Self::get_version) and
///   [`get_latest_version`](Self::get_latest_version) fall back to
///   [`NOT_FOUND`].
/// - [`check_version`](Self::check_version) treats an unreachable endpoint as
///   "update available" but fails on anything else.
/// - [`update`](Self::update) and
///   [`is_update_available`](Self::is_update_available) fail with an
///   [`UpdaterError`] wrapping the cause.
pub struct Updater {
    client: reqwest::Client,
    pool: WorkerPool,
    version_entry: String,
}

impl Updater {
    #[must_use]
    pub fn new(client: reqwest::Client, pool: WorkerPool) -> Self {
        Self {
            client,
            pool,
            version_entry: DEFAULT_VERSION_ENTRY.to_string(),
        }
    }

    /// Build an updater with its own HTTP client and worker pool.
    ///
    /// # Errors
    /// Returns an error if the HTTP client or the runtime cannot be created.
    pub fn from_settings(settings: &UpdaterSettings) -> Result<Self, BuildError> {
        let client = settings.build_client().map_err(BuildError::Client)?;
        let pool = WorkerPool::new(settings.worker_threads).map_err(BuildError::Runtime)?;
        Ok(Self::new(client, pool).with_version_entry(settings.version_entry.as_str()))
    }

    /// Archive entry used by [`needs_update`](Self::needs_update).
    #[must_use]
    pub fn with_version_entry(mut self, version_entry: impl Into<String>) -> Self {
        self.version_entry = version_entry.into();
        self
    }

    #[must_use]
    pub fn version_entry(&self) -> &str {
        &self.version_entry
    }

    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Download `download_url` into `target`, replacing it.
    pub fn update(
        &self,
        target: impl Into<PathBuf>,
        download_url: impl Into<String>,
        listener: Option<Arc<dyn ProgressListener>>,
    ) -> UpdateTask<()> {
        let client = self.client.clone();
        let target = target.into();
        let url = download_url.into();

        self.pool.spawn("update", async move {
            info!(
                "Starting update from {url} to target file {}",
                target.display()
            );
            match download_with_progress(&client, &url, &target, listener.as_deref()).await {
                Ok(_) => {
                    info!("Updated {} from {url}", target.display());
                    Ok(())
                }
                Err(source) => {
                    warn!("Update failed: {source}");
                    Err(UpdaterError::Update {
                        url,
                        target,
                        source,
                    })
                }
            }
        })
    }

    /// Whether `target` should be replaced by the version published at
    /// `version_url`.
    ///
    /// A missing target always needs an update and is reported without any
    /// network or archive access. Otherwise the embedded version is read
    /// first and then checked against the endpoint.
    pub fn is_update_available(
        &self,
        target: impl Into<PathBuf>,
        version_url: impl Into<String>,
        version_entry: impl Into<String>,
    ) -> UpdateTask<bool> {
        let client = self.client.clone();
        let target = target.into();
        let version_url = version_url.into();
        let version_entry = version_entry.into();

        self.pool.spawn("update availability check", async move {
            info!(
                "Checking for update: file = {}, version URL = {version_url}",
                target.display()
            );

            if !target.exists() {
                info!(
                    "Update available: target file does not exist: {}",
                    target.display()
                );
                return Ok(true);
            }

            let version = local_version(target.clone(), version_entry).await;
            info!(
                "Checking update for version {version} of {}",
                target.display()
            );

            let available = check_version(client, version.clone(), version_url).await?;
            info!(
                "Update availability checked: current version = {version}, \
                 update available = {available}"
            );
            Ok(available)
        })
    }

    /// [`is_update_available`](Self::is_update_available) using the
    /// configured version entry.
    pub fn needs_update(
        &self,
        target: impl Into<PathBuf>,
        version_url: impl Into<String>,
    ) -> UpdateTask<bool> {
        self.is_update_available(target, version_url, self.version_entry.as_str())
    }

    /// Version embedded in `file` under `version_entry`, or [`NOT_FOUND`]
    /// when it cannot be read for any reason.
    pub fn get_version(
        &self,
        file: impl Into<PathBuf>,
        version_entry: impl Into<String>,
    ) -> UpdateTask<String> {
        let file = file.into();
        let version_entry = version_entry.into();

        self.pool.spawn("version retrieval", async move {
            Ok(local_version(file, version_entry).await)
        })
    }

    /// Version published at `version_url`, or [`NOT_FOUND`] when it cannot
    /// be fetched.
    pub fn get_latest_version(&self, version_url: impl Into<String>) -> UpdateTask<String> {
        let client = self.client.clone();
        let version_url = version_url.into();

        self.pool.spawn("latest version retrieval", async move {
            match fetch_latest_version(&client, &version_url).await {
                Ok(latest) => Ok(latest),
                Err(error) => {
                    warn!("Could not retrieve latest version: {error}");
                    Ok(NOT_FOUND.to_string())
                }
            }
        })
    }

    /// Whether `version` is outdated compared to the one at `version_url`.
    pub fn check_version(
        &self,
        version: impl Into<String>,
        version_url: impl Into<String>,
    ) -> UpdateTask<bool> {
        let client = self.client.clone();
        let version = version.into();
        let version_url = version_url.into();

        self.pool.spawn("version check", check_version(client, version, version_url))
    }

    /// Stop accepting new operations. Running operations finish normally.
    pub fn close(&self) {
        self.pool.close();
    }

    /// Resolves once the updater is closed and all running operations are done.
    pub async fn closed(&self) {
        self.pool.wait().await;
    }
}

async fn local_version(file: PathBuf, version_entry: String) -> String {
    let read =
        tokio::task::spawn_blocking(move || read_archive_version(&file, &version_entry)).await;

    match read {
        Ok(Ok(version)) => version,
        Ok(Err(error)) => {
            warn!("Could not read embedded version: {error}");
            NOT_FOUND.to_string()
        }
        Err(error) => {
            warn!("Version retrieval task failed: {error}");
            NOT_FOUND.to_string()
        }
    }
}

async fn check_version(
    client: reqwest::Client,
    version: String,
    version_url: String,
) -> Result<bool, UpdaterError> {
    info!(
        "Checking for update with current version {version} using version URL {version_url}"
    );

    let mut checker = UpdateChecker::new(client, version_url.as_str());
    match checker.check_update(&version).await {
        Ok(available) => {
            info!(
                "Update check completed: version URL = {version_url}, \
                 update available = {available}"
            );
            Ok(available)
        }
        Err(source) => {
            warn!("Update availability check failed: {source}");
            Err(UpdaterError::Check {
                url: version_url,
                source,
            })
        }
    }
}
