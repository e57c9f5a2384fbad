//! On-disk session storage for the `bb` CLI.
//!
//! `bb signin` writes the cookies it receives as a JSON list; later commands
//! read them back to authenticate. The file holds live credentials, so it is
//! created with owner-only permissions on Unix.

use std::path::Path;

use anyhow::{Context, Result};
use bb_client::SessionCookies;

/// Default session file, relative to the current directory.
pub const DEFAULT_SESSION_FILE: &str = ".bb-session.json";

/// Persist `cookies` to `path`, replacing any previous session.
pub fn save(path: &Path, cookies: &SessionCookies) -> Result<()> {
    let json = serde_json::to_vec_pretty(cookies).context("failed to encode session cookies")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write session file: {}", path.display()))?;
    restrict_permissions(path)?;
    Ok(())
}

/// Read the cookies saved at `path`.
pub fn load(path: &Path) -> Result<SessionCookies> {
    let raw = std::fs::read(path).with_context(|| {
        format!(
            "failed to read session file {} (run `bb signin` first)",
            path.display()
        )
    })?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("session file is corrupt: {}", path.display()))
}

/// Delete the session file. A missing file is not an error.
pub fn remove(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e)
            .with_context(|| format!("failed to remove session file: {}", path.display())),
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("failed to restrict permissions: {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
