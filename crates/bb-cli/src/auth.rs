//! # Session Subcommands
//!
//! `bb signin`, `bb whoami` and `bb signout`. Sign-in stores the issued
//! cookies in a session file that the other two read back.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bb_client::{Client, ClientError, SignInParams};
use clap::Args;
use zeroize::Zeroizing;

use crate::session_file;

/// Arguments for `bb signin`.
#[derive(Args, Debug)]
pub struct SigninArgs {
    /// Account name.
    #[arg(long, short)]
    pub username: String,

    /// Account password.
    #[arg(long, short, env = "BB_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Where to store the session cookies.
    #[arg(long, default_value = session_file::DEFAULT_SESSION_FILE)]
    pub session: PathBuf,
}

/// Arguments for `bb whoami`.
#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Session file written by `bb signin`.
    #[arg(long, default_value = session_file::DEFAULT_SESSION_FILE)]
    pub session: PathBuf,

    /// Authenticate with `USER:PASSWORD` instead of a stored session.
    #[arg(long, value_name = "USER:PASSWORD", conflicts_with = "session")]
    pub basic_auth: Option<String>,
}

/// Arguments for `bb signout`.
#[derive(Args, Debug)]
pub struct SignoutArgs {
    /// Session file written by `bb signin`; removed afterwards.
    #[arg(long, default_value = session_file::DEFAULT_SESSION_FILE)]
    pub session: PathBuf,
}

/// Execute `bb signin`.
pub async fn run_signin(args: &SigninArgs, client: &Client) -> Result<u8> {
    let params = SignInParams::new(args.username.as_str(), args.password.as_str());
    let cookies = match client.signin(&params).await {
        Ok(cookies) => cookies,
        Err(ClientError::NotFound) => {
            eprintln!("FAIL: user does not exist or password mismatch");
            return Ok(1);
        }
        Err(e) => return Err(e).context("sign-in failed"),
    };

    session_file::save(&args.session, &cookies)?;
    println!("OK: signed in as {}", args.username);
    println!("  Session: {}", args.session.display());
    Ok(0)
}

/// Execute `bb whoami`.
pub async fn run_whoami(args: &WhoamiArgs, client: &Client) -> Result<u8> {
    let client = match &args.basic_auth {
        Some(pair) => {
            let (user, password) = parse_basic_auth(pair)?;
            client.with_basic_auth(user, password.as_str())
        }
        None => client.with_cookies(session_file::load(&args.session)?),
    };

    match client.current_user().await {
        Ok(user) => {
            println!("{}", serde_json::to_string_pretty(&user)?);
            Ok(0)
        }
        Err(ClientError::Unauthorized) => {
            eprintln!("FAIL: not signed in or session expired");
            Ok(1)
        }
        Err(e) => Err(e).context("failed to fetch current user"),
    }
}

/// Execute `bb signout`.
pub async fn run_signout(args: &SignoutArgs, client: &Client) -> Result<u8> {
    let client = if args.session.exists() {
        client.with_cookies(session_file::load(&args.session)?)
    } else {
        tracing::info!(session = %args.session.display(), "no session file; signing out anonymously");
        client.clone()
    };

    client.signout().await.context("sign-out failed")?;
    session_file::remove(&args.session)?;
    println!("OK: signed out");
    Ok(0)
}

/// Split `USER:PASSWORD` at the first colon.
pub fn parse_basic_auth(pair: &str) -> Result<(&str, Zeroizing<String>)> {
    let Some((user, password)) = pair.split_once(':') else {
        bail!("--basic-auth must look like USER:PASSWORD");
    };
    if user.is_empty() {
        bail!("--basic-auth user name is empty");
    }
    Ok((user, Zeroizing::new(password.to_string())))
}
