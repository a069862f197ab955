//! Bitbucket API client.
//!
//! [`BitBucket`] owns the credentials, the injected [`ApiConfig`], and the
//! transport. Resource handles borrow it and route every request through
//! [`BitBucket::load_url`].

use std::fmt;

use bbkit_core::{
    basic_auth_header, require_authentication, ApiConfig, Credentials, Error, FailurePolicy,
    Result,
};
use serde_json::Value;
use tracing::warn;

use crate::handles::{Repository, User};
use crate::transport::{HttpTransport, Request, Transport};

/// Body substituted for a failed request under [`FailurePolicy::EmptyList`].
pub const EMPTY_LIST: &str = "[]";

/// Bitbucket API client.
pub struct BitBucket {
    username: String,
    password: String,
    config: ApiConfig,
    transport: Box<dyn Transport>,
}

impl BitBucket {
    /// Create a client for the public Bitbucket API. Empty strings mean
    /// anonymous access.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        Self::with_config(username, password, ApiConfig::default())
    }

    /// Create an anonymous client.
    pub fn anonymous() -> Result<Self> {
        Self::new("", "")
    }

    /// Create a client with explicit endpoints and failure policy.
    pub fn with_config(
        username: impl Into<String>,
        password: impl Into<String>,
        config: ApiConfig,
    ) -> Result<Self> {
        let transport = HttpTransport::new()?;
        Ok(Self::with_transport(
            username,
            password,
            config,
            Box::new(transport),
        ))
    }

    /// Create a client on top of a custom transport.
    pub fn with_transport(
        username: impl Into<String>,
        password: impl Into<String>,
        config: ApiConfig,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            config: config.normalized(),
            transport,
        }
    }

    /// Resource endpoint, always ending in `/`.
    pub fn api_base(&self) -> &str {
        &self.config.api_base
    }

    /// Build the GET request for `url`, with Basic auth when both
    /// credentials are set.
    pub fn build_request(&self, url: &str) -> Request {
        let request = Request::get(url)
            .with_header("User-Agent", self.config.user_agent.as_str())
            .with_header("Accept", "application/json");

        match basic_auth_header(self) {
            Some(auth) => request.with_header("Authorization", auth),
            None => request,
        }
    }

    /// Fetch `url` and return the body, surfacing any failure regardless of
    /// the configured policy.
    pub fn try_load_url(&self, url: &str) -> Result<String> {
        let request = self.build_request(url);
        self.transport.execute(&request)
    }

    /// Fetch `url` and return the body.
    ///
    /// Failures are logged unless `quiet`. Under [`FailurePolicy::EmptyList`]
    /// they come back as the body `"[]"`; under [`FailurePolicy::Surface`]
    /// they are returned as errors.
    pub fn load_url(&self, url: &str, quiet: bool) -> Result<String> {
        match self.try_load_url(url) {
            Ok(body) => Ok(body),
            Err(e) => self.on_failure(url, quiet, e).map(|()| EMPTY_LIST.to_string()),
        }
    }

    /// Fetch `url` and parse the body as JSON, under the same failure policy
    /// as [`BitBucket::load_url`].
    pub(crate) fn load_json(&self, url: &str, quiet: bool) -> Result<Value> {
        let body = self.load_url(url, quiet)?;
        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                let err = Error::InvalidData(format!("Failed to parse response: {}", e));
                self.on_failure(url, quiet, err)
                    .map(|()| Value::Array(Vec::new()))
            }
        }
    }

    /// Log unless `quiet`, then apply the failure policy. `Ok(())` means
    /// substitute the empty list.
    fn on_failure(&self, url: &str, quiet: bool, err: Error) -> Result<()> {
        if !quiet {
            warn!(url = url, error = %err, "Bitbucket request failed");
        }
        match self.config.failure_policy {
            FailurePolicy::EmptyList => Ok(()),
            FailurePolicy::Surface => Err(err),
        }
    }

    /// Handle for a user.
    pub fn user(&self, username: impl Into<String>) -> User<'_> {
        User::new(self, username)
    }

    /// Handle for a repository.
    pub fn repository(&self, username: impl Into<String>, slug: impl Into<String>) -> Repository<'_> {
        Repository::new(self, username, slug)
    }

    /// Email addresses configured for the authenticated user.
    pub fn emails(&self) -> Result<Value> {
        require_authentication(self, "emails")?;
        let url = format!("{}emails/", self.api_base());
        self.load_json(&url, false)
    }
}

impl Credentials for BitBucket {
    fn username(&self) -> &str {
        &self.username
    }

    fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for BitBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitBucket")
            .field("username", &self.username)
            .field(
                "password",
                &if self.password.is_empty() { "" } else { "<redacted>" },
            )
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use serde_json::json;

    fn client_with(mock: MockTransport, username: &str, password: &str) -> BitBucket {
        BitBucket::with_transport(username, password, ApiConfig::default(), Box::new(mock))
    }

    fn unused_transport() -> MockTransport {
        let mut mock = MockTransport::new();
        mock.expect_execute().times(0);
        mock
    }

    // =========================================================================
    // Request builder tests
    // =========================================================================

    #[test]
    fn test_build_request_with_credentials() {
        let bb = client_with(unused_transport(), "bob", "secret");
        let request = bb.build_request("https://api.bitbucket.org/1.0/emails/");
        assert_eq!(request.url, "https://api.bitbucket.org/1.0/emails/");
        assert_eq!(
            request.header("Authorization"),
            Some("Basic Ym9iOnNlY3JldA==")
        );
        assert_eq!(request.header("User-Agent"), Some("bbkit"));
    }

    #[test]
    fn test_build_request_without_credentials() {
        for (username, password) in [("", ""), ("bob", ""), ("", "secret")] {
            let bb = client_with(unused_transport(), username, password);
            let request = bb.build_request("https://api.bitbucket.org/1.0/users/bob/");
            assert!(request.header("Authorization").is_none());
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let bb = client_with(unused_transport(), "bob", "secret");
        let debug = format!("{:?}", bb);
        assert!(debug.contains("bob"));
        assert!(!debug.contains("secret"));
    }

    // =========================================================================
    // Authentication guard tests
    // =========================================================================

    #[test]
    fn test_emails_requires_authentication() {
        for (username, password) in [("", ""), ("bob", ""), ("", "secret")] {
            let bb = client_with(unused_transport(), username, password);
            let err = bb.emails().unwrap_err();
            match err {
                Error::AuthenticationRequired { operation } => assert_eq!(operation, "emails"),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_emails_with_credentials() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|request: &Request| {
                request.url == "https://api.bitbucket.org/1.0/emails/"
                    && request.header("Authorization") == Some("Basic Ym9iOnNlY3JldA==")
            })
            .times(1)
            .returning(|_| Ok(r#"[{"email": "bob@example.com", "primary": true}]"#.to_string()));

        let bb = client_with(mock, "bob", "secret");
        let emails = bb.emails().unwrap();
        assert_eq!(emails[0]["email"], "bob@example.com");
    }

    // =========================================================================
    // Failure policy tests
    // =========================================================================

    #[test]
    fn test_load_url_masks_failure_as_empty_list() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Err(Error::Http("connection refused".to_string())));

        let bb = client_with(mock, "", "");
        assert_eq!(bb.load_url("http://localhost/x/", false).unwrap(), "[]");
    }

    #[test]
    fn test_load_url_surface_policy_returns_error() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Err(Error::from_status(500, "boom")));

        let config = ApiConfig::default().with_failure_policy(FailurePolicy::Surface);
        let bb = BitBucket::with_transport("", "", config, Box::new(mock));
        let err = bb.load_url("http://localhost/x/", true).unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
    }

    #[test]
    fn test_try_load_url_always_surfaces() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Err(Error::Http("timed out".to_string())));

        let bb = client_with(mock, "", "");
        assert!(matches!(
            bb.try_load_url("http://localhost/x/"),
            Err(Error::Http(_))
        ));
    }

    #[test]
    fn test_load_json_masks_malformed_body() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok("<html>oops</html>".to_string()));

        let bb = client_with(mock, "", "");
        assert_eq!(bb.load_json("http://localhost/x/", false).unwrap(), json!([]));
    }

    #[test]
    fn test_load_json_surfaces_malformed_body() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok("<html>oops</html>".to_string()));

        let config = ApiConfig::default().with_failure_policy(FailurePolicy::Surface);
        let bb = BitBucket::with_transport("", "", config, Box::new(mock));
        assert!(matches!(
            bb.load_json("http://localhost/x/", false),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_custom_endpoint_is_normalized() {
        let bb = BitBucket::with_transport(
            "",
            "",
            ApiConfig::with_base_url("http://localhost:9000/1.0"),
            Box::new(unused_transport()),
        );
        assert_eq!(bb.api_base(), "http://localhost:9000/1.0/");
    }

    // =========================================================================
    // Integration tests with httpmock
    // =========================================================================

    mod integration {
        use super::*;
        use httpmock::prelude::*;

        fn create_client(server: &MockServer, username: &str, password: &str) -> BitBucket {
            BitBucket::with_config(username, password, ApiConfig::with_base_url(server.base_url()))
                .unwrap()
        }

        #[test]
        fn test_emails_sends_basic_auth() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/emails/")
                    .header("Authorization", "Basic Ym9iOnNlY3JldA==");
                then.status(200).json_body(json!([
                    {"email": "bob@example.com", "primary": true, "active": true}
                ]));
            });

            let bb = create_client(&server, "bob", "secret");
            let emails = bb.emails().unwrap();

            mock.assert();
            assert_eq!(emails.as_array().unwrap().len(), 1);
            assert_eq!(emails[0]["primary"], true);
        }

        #[test]
        fn test_emails_without_credentials_never_hits_server() {
            // Any request would come back as a masked 404, not an error.
            let server = MockServer::start();

            let bb = create_client(&server, "bob", "");
            assert!(matches!(
                bb.emails(),
                Err(Error::AuthenticationRequired { .. })
            ));
        }

        #[test]
        fn test_http_error_becomes_empty_list() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/users/ghost/");
                then.status(404).body("Not Found");
            });

            let bb = create_client(&server, "", "");
            assert_eq!(bb.user("ghost").get().unwrap(), json!([]));
        }

        #[test]
        fn test_http_error_surfaced_in_surface_mode() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/users/ghost/");
                then.status(404).body("Not Found");
            });

            let config = ApiConfig::with_base_url(server.base_url())
                .with_failure_policy(FailurePolicy::Surface);
            let bb = BitBucket::with_config("", "", config).unwrap();
            let err = bb.user("ghost").get().unwrap_err();
            assert!(matches!(err, Error::Api { status: 404, .. }));
        }
    }
}
