//! # bb-client -- Typed Rust client for the ByteBuilders APIs
//!
//! Provides typed access to two capabilities of `byte.builders`:
//! - **Sessions** via `/api/v1/user/signin`, `/api/v1/user/signout` and
//!   `/api/v1/user` ([`Client`])
//! - **Licenses** via `/api/v1/user/licenses/verify` ([`LicenseVerifier`],
//!   [`verify_license`], [`license_plan`])
//!
//! ## Usage
//!
//! ```no_run
//! # async fn demo() -> Result<(), bb_client::ClientError> {
//! use bb_client::{Client, ClientConfig, SignInParams};
//!
//! let client = Client::from_config(&ClientConfig::from_env()?)?;
//! let cookies = client.signin(&SignInParams::new("appscode", "password")).await?;
//!
//! let session = client.with_cookies(cookies);
//! let me = session.current_user().await?;
//! println!("signed in as {}", me.login);
//! session.signout().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Every call is one HTTP exchange. Nothing is retried or cached, and no
//! request timeout is imposed; pass a preconfigured `reqwest::Client` via
//! `with_http_client` to add one.

pub mod config;
pub mod credentials;
pub mod error;
pub mod license;
pub mod session;

pub use config::{ClientConfig, ConfigError};
pub use credentials::{Credentials, SessionCookie, SessionCookies};
pub use error::{ClientError, ErrorKind};
pub use license::{license_plan, verify_license, License, LicenseVerifier, SubscribedPlan};
pub use session::{Client, SignInParams, User};

pub(crate) fn build_http_client() -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .user_agent(concat!("bb-client/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ClientError::Http {
            endpoint: "client_init".into(),
            source: e,
        })
}
