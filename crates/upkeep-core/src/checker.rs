use log::{info, warn};

use crate::remote::{FetchError, fetch_first_line};
use crate::version::Version;
use crate::{INVALID, NOT_FOUND};

/// Compares a locally known version against the one published at a fixed URL.
pub struct UpdateChecker {
    client: reqwest::Client,
    version_url: String,
    update_available: bool,
}

impl UpdateChecker {
    pub fn new(client: reqwest::Client, version_url: impl Into<String>) -> Self {
        Self {
            client,
            version_url: version_url.into(),
            update_available: false,
        }
    }

    #[must_use]
    pub fn version_url(&self) -> &str {
        &self.version_url
    }

    /// Outcome of the most recent [`check_update`](Self::check_update), `false`
    /// before any check has run.
    #[must_use]
    pub fn is_update_available(&self) -> bool {
        self.update_available
    }

    /// Decide whether `current_version` is outdated.
    ///
    /// Failing to reach the endpoint counts as "update available".
    ///
    /// # Errors
    /// Returns an error only when the version URL itself is malformed.
    pub async fn check_update(&mut self, current_version: &str) -> Result<bool, FetchError> {
        info!(
            "Starting update check: current version = {current_version}, version URL = {}",
            self.version_url
        );

        self.update_available = match fetch_first_line(&self.client, &self.version_url).await {
            Ok(latest_version) => {
                let available = is_newer_available(current_version, &latest_version);
                info!(
                    "Update check finished: latest version = {latest_version}, \
                     update available = {available}"
                );
                available
            }
            Err(error) if error.is_transport() => {
                warn!("Error while checking for an update: {error}");
                true
            }
            Err(error) => return Err(error),
        };

        Ok(self.update_available)
    }
}

/// Apply the availability rules to a local and a remote version string.
///
/// Either sentinel forces an update. Differing strings are compared as
/// versions, and an unparsable side also forces an update.
#[must_use]
pub fn is_newer_available(current_version: &str, latest_version: &str) -> bool {
    if latest_version == INVALID || current_version == NOT_FOUND {
        return true;
    }
    if current_version == latest_version {
        return false;
    }

    match (
        current_version.parse::<Version>(),
        latest_version.parse::<Version>(),
    ) {
        (Ok(current), Ok(latest)) => latest > current,
        (Err(error), _) | (_, Err(error)) => {
            warn!("Could not parse version: {error}");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{UpdateChecker, is_newer_available};
    use crate::remote::FetchError;
    use crate::{INVALID, NOT_FOUND};

    #[test]
    fn missing_local_version_always_updates() {
        assert!(is_newer_available(NOT_FOUND, "1.0.0"));
        assert!(is_newer_available(NOT_FOUND, NOT_FOUND));
        assert!(is_newer_available(NOT_FOUND, ""));
    }

    #[test]
    fn invalid_remote_version_always_updates() {
        assert!(is_newer_available("1.0.0", INVALID));
        assert!(is_newer_available(INVALID, INVALID));
    }

    #[test]
    fn compares_numerically_when_strings_differ() {
        assert!(is_newer_available("1.0.0", "1.0.1"));
        assert!(!is_newer_available("1.0.0", "1.0.0"));
        assert!(!is_newer_available("1.0.0", "0.9.9"));
        assert!(!is_newer_available("1.2.0", "1.2"));
        assert!(is_newer_available("1.9", "1.10"));
    }

    #[test]
    fn unparsable_versions_fail_open() {
        assert!(is_newer_available("abc", "1.0.0"));
        assert!(is_newer_available("1.0.0", "abc"));
        assert!(is_newer_available("1.0.0", ""));
    }

    #[test]
    fn overflowing_component_fails_open() {
        assert!(is_newer_available("1.0", "1.99999999999999999999999"));
        assert!(is_newer_available("1.99999999999999999999999", "1.0"));
    }

    #[test]
    fn equal_unparsable_strings_do_not_update() {
        assert!(!is_newer_available("nightly", "nightly"));
    }

    async fn serve_version(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn check_update_against_remote_versions() {
        for (remote, expected) in [("1.0.1\n", true), ("1.0.0\n", false), ("0.9.9\n", false)] {
            let server = serve_version(remote).await;
            let mut checker = UpdateChecker::new(reqwest::Client::new(), server.uri());

            let available = checker
                .check_update("1.0.0")
                .await
                .expect("check should complete");

            assert_eq!(available, expected, "remote {remote:?}");
            assert_eq!(checker.is_update_available(), expected);
        }
    }

    #[tokio::test]
    async fn check_update_fails_open_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut checker = UpdateChecker::new(reqwest::Client::new(), server.uri());
        assert!(checker.check_update("1.0.0").await.expect("check should complete"));
    }

    #[tokio::test]
    async fn check_update_fails_open_when_unreachable() {
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };

        let mut checker = UpdateChecker::new(reqwest::Client::new(), uri);
        assert!(checker.check_update("1.0.0").await.expect("check should complete"));
    }

    #[tokio::test]
    async fn check_update_rejects_malformed_url() {
        let mut checker = UpdateChecker::new(reqwest::Client::new(), "::not-a-url::");
        let result = checker.check_update("1.0.0").await;

        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
        assert!(!checker.is_update_available());
    }

    #[test]
    fn new_checker_reports_no_update() {
        let checker = UpdateChecker::new(reqwest::Client::new(), "http://localhost/version");
        assert!(!checker.is_update_available());
        assert_eq!(checker.version_url(), "http://localhost/version");
    }
}
