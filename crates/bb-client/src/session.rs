//! Session client for the ByteBuilders user API.
//!
//! ## Endpoints
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/api/v1/user/signin` | Exchange credentials for session cookies |
//! | POST   | `/api/v1/user/signout` | Invalidate the current session |
//! | GET    | `/api/v1/user` | Identity bound to the attached credentials |
//!
//! A [`Client`] is an immutable value. [`Client::with_cookies`] and
//! [`Client::with_basic_auth`] return a new client with a different
//! [`Credentials`] mode; the receiver is left untouched.

use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::Zeroizing;

use crate::config::{join_path, ClientConfig};
use crate::credentials::{Credentials, SessionCookies};
use crate::error::ClientError;
use crate::license::LicenseVerifier;

const SIGNIN_PATH: &str = "api/v1/user/signin";
const SIGNOUT_PATH: &str = "api/v1/user/signout";
const CURRENT_USER_PATH: &str = "api/v1/user";

// -- Request/Response types ----------------------------------------------------

/// Credentials submitted to the sign-in endpoint.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInParams {
    pub user_name: String,
    pub password: Zeroizing<String>,
}

impl SignInParams {
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    fn is_incomplete(&self) -> bool {
        self.user_name.is_empty() || self.password.is_empty()
    }
}

impl std::fmt::Debug for SignInParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInParams")
            .field("user_name", &self.user_name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(alias = "username")]
    pub login: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

// -- Client -------------------------------------------------------------------

/// Client bound to one ByteBuilders server and one credential mode.
///
/// Custom `Debug` implementation redacts the attached license token.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    license: Option<Zeroizing<String>>,
    verifier: LicenseVerifier,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("license", &self.license.as_ref().map(|_| "[REDACTED]"))
            .field("verifier", &self.verifier)
            .finish()
    }
}

impl Client {
    /// Anonymous client for `base_url`, verifying licenses against the
    /// same server.
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        Self::from_config(&ClientConfig::for_server(base_url)?)
    }

    /// Anonymous client using the URLs in `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = crate::build_http_client()?;
        Ok(Self {
            verifier: LicenseVerifier::from_parts(http.clone(), config.license_verify_url.clone()),
            http,
            base_url: config.server_url.clone(),
            credentials: Credentials::None,
            license: None,
        })
    }

    /// Replace the transport, e.g. to apply a caller-chosen timeout.
    pub fn with_http_client(&self, http: reqwest::Client) -> Self {
        Self {
            verifier: self.verifier.clone().with_http_client(http.clone()),
            http,
            ..self.clone()
        }
    }

    /// New client on the same server authenticating with `cookies`.
    pub fn with_cookies(&self, cookies: SessionCookies) -> Self {
        self.with_credentials(Credentials::Cookies(cookies))
    }

    /// New client on the same server authenticating with HTTP Basic.
    pub fn with_basic_auth(&self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.with_credentials(Credentials::BasicAuth {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        })
    }

    /// New client on the same server with `credentials` replacing the
    /// current mode.
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            credentials,
            ..self.clone()
        }
    }

    /// New client carrying `token` for [`Client::license_plan`].
    pub fn with_license(&self, token: impl Into<String>) -> Self {
        Self {
            license: Some(Zeroizing::new(token.into())),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn license_verifier(&self) -> &LicenseVerifier {
        &self.verifier
    }

    /// Sign in and return the session cookies the server issued.
    ///
    /// Calls `POST {base_url}/api/v1/user/signin`. Missing, unknown and wrong
    /// credentials all yield [`ClientError::NotFound`].
    pub async fn signin(&self, params: &SignInParams) -> Result<SessionCookies, ClientError> {
        let endpoint = "POST /api/v1/user/signin";
        if params.is_incomplete() {
            return Err(ClientError::NotFound);
        }
        let url = join_path(&self.base_url, SIGNIN_PATH)?;

        tracing::debug!(endpoint, user = %params.user_name, "signing in");
        let resp = self
            .http
            .post(url)
            .json(params)
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        match resp.status() {
            reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::UNAUTHORIZED => {
                return Err(ClientError::NotFound)
            }
            status if !status.is_success() => return Err(api_error(endpoint, resp).await),
            _ => {}
        }

        let cookies = SessionCookies::from_response(&resp);
        if cookies.is_empty() {
            return Err(ClientError::MissingCookies {
                endpoint: endpoint.into(),
            });
        }
        Ok(cookies)
    }

    /// Invalidate the current session on the server.
    ///
    /// Calls `POST {base_url}/api/v1/user/signout`. Succeeds when there was no
    /// session to begin with.
    pub async fn signout(&self) -> Result<(), ClientError> {
        let endpoint = "POST /api/v1/user/signout";
        let url = join_path(&self.base_url, SIGNOUT_PATH)?;

        tracing::debug!(endpoint, "signing out");
        let resp = self
            .credentials
            .apply(self.http.post(url))
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let status = resp.status();
        if status.is_success() || status == reqwest::StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(api_error(endpoint, resp).await)
        }
    }

    /// The user the attached credentials belong to.
    ///
    /// Calls `GET {base_url}/api/v1/user`.
    pub async fn current_user(&self) -> Result<User, ClientError> {
        let endpoint = "GET /api/v1/user";
        if self.credentials.is_none() {
            return Err(ClientError::Unauthorized);
        }
        let url = join_path(&self.base_url, CURRENT_USER_PATH)?;

        let resp = self
            .credentials
            .apply(self.http.get(url))
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        match resp.status() {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(ClientError::Unauthorized)
            }
            status if !status.is_success() => return Err(api_error(endpoint, resp).await),
            _ => {}
        }

        resp.json().await.map_err(|e| ClientError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
    }

    /// Plan covering `(product_id, owner_id)` on `cluster_id` according to the
    /// license attached with [`Client::with_license`].
    ///
    /// The token is checked at this client's verification endpoint, which is
    /// not necessarily production: [`Client::new`] derives it from the base
    /// URL and [`Client::from_config`] takes `license_verify_url`. Use the free
    /// [`license_plan`](crate::license_plan) to always hit production.
    pub async fn license_plan(
        &self,
        cluster_id: &str,
        product_id: &str,
        owner_id: i64,
    ) -> Option<String> {
        let token = self.license.as_ref()?;
        self.verifier
            .license_plan(token, cluster_id, product_id, owner_id)
            .await
    }
}

async fn api_error(endpoint: &str, resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(endpoint, status, "unexpected response from ByteBuilders API");
    ClientError::ApiError {
        endpoint: endpoint.into(),
        status,
        body,
    }
}
