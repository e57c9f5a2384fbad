//! ByteBuilders client configuration.
//!
//! Configures the base URL of the authentication server and the absolute URL
//! of the license-verification endpoint. Defaults point to production.
//! Override via environment variables or explicit construction for
//! staging/testing.

use url::Url;

/// Production server hosting the user and session endpoints.
pub const DEFAULT_SERVER_URL: &str = "https://byte.builders";

/// Production license-verification endpoint.
pub const DEFAULT_LICENSE_VERIFY_URL: &str = "https://byte.builders/api/v1/user/licenses/verify";

/// Path of the verification endpoint relative to a server root.
pub(crate) const LICENSE_VERIFY_PATH: &str = "api/v1/user/licenses/verify";

/// Configuration for connecting to the ByteBuilders services.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for sign-in, sign-out and current-user calls.
    /// Default: <https://byte.builders>
    pub server_url: Url,
    /// Absolute URL of the license-verification endpoint.
    /// Default: <https://byte.builders/api/v1/user/licenses/verify>
    pub license_verify_url: Url,
}

impl ClientConfig {
    /// Production endpoints, ignoring the environment.
    pub fn production() -> Result<Self, ConfigError> {
        Ok(Self {
            server_url: parse_url("server", DEFAULT_SERVER_URL)?,
            license_verify_url: parse_url("license verification", DEFAULT_LICENSE_VERIFY_URL)?,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `BB_SERVER_URL` (default: `https://byte.builders`)
    /// - `BB_LICENSE_VERIFY_URL` (default: derived from `BB_SERVER_URL` when
    ///   that is set, else `https://byte.builders/api/v1/user/licenses/verify`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup("BB_SERVER_URL") {
            Some(raw) => Self::for_server(parse_url("BB_SERVER_URL", &raw)?)?,
            None => Self::production()?,
        };
        if let Some(raw) = lookup("BB_LICENSE_VERIFY_URL") {
            config.license_verify_url = parse_url("BB_LICENSE_VERIFY_URL", &raw)?;
        }
        Ok(config)
    }

    /// Create a configuration pointing both services at one local server.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the localhost URL cannot be parsed.
    pub fn local_mock(port: u16) -> Result<Self, ConfigError> {
        let server_url = Url::parse(&format!("http://127.0.0.1:{port}"))
            .map_err(|e| ConfigError::InvalidUrl("localhost".to_string(), e.to_string()))?;
        Self::for_server(server_url)
    }

    /// Point both services at `server_url`, deriving the verification
    /// endpoint from the server root.
    pub fn for_server(server_url: Url) -> Result<Self, ConfigError> {
        let license_verify_url = join_path(&server_url, LICENSE_VERIFY_PATH)?;
        Ok(Self {
            server_url,
            license_verify_url,
        })
    }
}

/// Join `path` onto `base`, keeping any path prefix `base` already carries.
pub(crate) fn join_path(base: &Url, path: &str) -> Result<Url, ConfigError> {
    let mut root = base.clone();
    if !root.path().ends_with('/') {
        let with_slash = format!("{}/", root.path());
        root.set_path(&with_slash);
    }
    root.join(path)
        .map_err(|e| ConfigError::InvalidUrl(base.to_string(), e.to_string()))
}

fn parse_url(label: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(label.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
