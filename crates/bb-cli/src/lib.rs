//! # bb-cli -- CLI Tool for the ByteBuilders APIs
//!
//! Provides the `bb` command-line interface over `bb-client`.
//!
//! ## Subcommands
//!
//! - `bb signin` -- Sign in and store the session cookies.
//! - `bb whoami` -- Show the user behind a session or basic-auth pair.
//! - `bb signout` -- End the stored session.
//! - `bb license verify` / `bb license plan` -- Verify license tokens.
//!
//! ```bash
//! bb signin -u appscode -p password
//! bb whoami
//! bb license plan "$TOKEN" --cluster c1 --product stash --owner 1
//! bb signout
//! ```

pub mod auth;
pub mod license;
pub mod session_file;

use anyhow::{Context, Result};
use bb_client::ClientConfig;
use url::Url;

/// Resolve endpoints from flags, falling back to the environment.
///
/// `--server` alone moves both services to that server;
/// `--license-endpoint` always wins for license verification.
pub fn resolve_config(server: Option<&Url>, license_endpoint: Option<&Url>) -> Result<ClientConfig> {
    let mut config = match server {
        Some(server) => ClientConfig::for_server(server.clone())
            .with_context(|| format!("invalid server URL: {server}"))?,
        None => ClientConfig::from_env().context("invalid endpoint configuration")?,
    };
    if let Some(endpoint) = license_endpoint {
        config.license_verify_url = endpoint.clone();
    }
    Ok(config)
}
