use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use upkeep_platform::AppPaths;

/// Archive entry read when no other entry is configured.
pub const DEFAULT_VERSION_ENTRY: &str = "version.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// `None` leaves the transport default in place.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Archive entry holding the embedded version marker.
    #[serde(default = "default_version_entry")]
    pub version_entry: String,

    #[serde(default)]
    pub worker_threads: Option<usize>,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_user_agent() -> String {
    format!("upkeep/{}", env!("CARGO_PKG_VERSION"))
}

fn default_version_entry() -> String {
    DEFAULT_VERSION_ENTRY.to_string()
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: None,
            request_timeout_secs: None,
            version_entry: default_version_entry(),
            worker_threads: None,
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl UpdaterSettings {
    /// Settings from the platform settings file, or defaults.
    #[must_use]
    pub fn load() -> Self {
        match AppPaths::new() {
            Ok(paths) => Self::load_from(&paths.settings_file()),
            Err(_) => Self::default(),
        }
    }

    /// Settings from a JSON file. A missing or malformed file yields defaults.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
                log::warn!("Ignoring malformed settings {}: {error}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Build the HTTP client shared by all updater operations.
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(self.user_agent.as_str());
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_VERSION_ENTRY, UpdaterSettings};

    #[test]
    fn defaults_leave_timeouts_to_transport() {
        let settings = UpdaterSettings::default();
        assert_eq!(settings.connect_timeout_secs, None);
        assert_eq!(settings.request_timeout_secs, None);
        assert_eq!(settings.version_entry, DEFAULT_VERSION_ENTRY);
        assert!(settings.user_agent.starts_with("upkeep/"));
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings: UpdaterSettings =
            serde_json::from_str(r#"{ "version_entry": "META-INF/version", "worker_threads": 2 }"#)
                .expect("settings should deserialize");

        assert_eq!(settings.version_entry, "META-INF/version");
        assert_eq!(settings.worker_threads, Some(2));
        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
        assert!(!settings.debug_logging);
    }

    #[test]
    fn load_from_falls_back_to_defaults() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let missing = temp.path().join("missing.json");
        assert_eq!(UpdaterSettings::load_from(&missing), UpdaterSettings::default());

        let malformed = temp.path().join("settings.json");
        std::fs::write(&malformed, "{ not json").expect("settings file should be written");
        assert_eq!(UpdaterSettings::load_from(&malformed), UpdaterSettings::default());
    }

    #[test]
    fn load_from_reads_file() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("settings.json");
        std::fs::write(&path, r#"{ "request_timeout_secs": 30, "debug_logging": true }"#)
            .expect("settings file should be written");

        let settings = UpdaterSettings::load_from(&path);
        assert_eq!(settings.request_timeout_secs, Some(30));
        assert!(settings.debug_logging);
    }

    #[test]
    fn client_builds_with_timeouts() {
        let settings = UpdaterSettings {
            connect_timeout_secs: Some(5),
            request_timeout_secs: Some(60),
            ..UpdaterSettings::default()
        };
        assert!(settings.build_client().is_ok());
    }
}
