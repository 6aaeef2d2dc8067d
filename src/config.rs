use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::ClientError;

/// WAPI version used when none is configured (NIOS 8.6).
pub const DEFAULT_WAPI_VERSION: &str = "2.12";

/// HTTP Basic credentials for a grid.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings for one grid.
///
/// Settings are fixed once a client is built from them.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    host: String,
    credentials: Credentials,
    version: String,
    tls_verify: bool,
    timeout: Option<Duration>,
    log_api_calls: bool,
}

impl ClientConfig {
    /// Creates settings for `host` with the default WAPI version and TLS verification on.
    ///
    /// `host` is normally a bare hostname or IP address. A value that already
    /// carries a scheme (`http://grid.example.com`) is used as the origin as-is.
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            credentials,
            version: DEFAULT_WAPI_VERSION.to_owned(),
            tls_verify: true,
            timeout: None,
            log_api_calls: false,
        }
    }

    /// Sets the WAPI version. A leading `v` is accepted and dropped.
    #[must_use]
    pub fn with_version(mut self, version: impl AsRef<str>) -> Self {
        self.version = version.as_ref().trim_start_matches('v').to_owned();
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub fn with_tls_verify(mut self, tls_verify: bool) -> Self {
        self.tls_verify = tls_verify;
        self
    }

    /// Sets a flat timeout applied to every request.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Logs every API call at `INFO` instead of `DEBUG`.
    #[must_use]
    pub fn with_log_api_calls(mut self, log_api_calls: bool) -> Self {
        self.log_api_calls = log_api_calls;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn log_api_calls(&self) -> bool {
        self.log_api_calls
    }

    /// Returns `https://<host>/wapi/v<version>/`.
    pub fn base_url(&self) -> Result<Url, ClientError> {
        let host = self.host.trim_end_matches('/');
        let origin = if host.contains("://") {
            host.to_owned()
        } else {
            format!("https://{host}")
        };

        Url::parse(&format!("{origin}/wapi/v{}/", self.version))
            .map_err(|_| ClientError::InvalidHost(self.host.clone()))
    }
}
