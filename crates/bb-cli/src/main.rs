//! # bb CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use bb_cli::auth::{run_signin, run_signout, run_whoami, SigninArgs, SignoutArgs, WhoamiArgs};
use bb_cli::license::{run_license, LicenseArgs};
use bb_client::{Client, LicenseVerifier};

/// ByteBuilders CLI
///
/// Signs in to byte.builders, inspects the current user, and verifies
/// license tokens.
#[derive(Parser, Debug)]
#[command(name = "bb", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Server base URL (default: $BB_SERVER_URL or https://byte.builders).
    #[arg(long, global = true)]
    server: Option<Url>,

    /// License verification URL (default: derived from --server, else
    /// $BB_LICENSE_VERIFY_URL).
    #[arg(long, global = true)]
    license_endpoint: Option<Url>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and store the session cookies.
    Signin(SigninArgs),

    /// Show the user behind the stored session or a basic-auth pair.
    Whoami(WhoamiArgs),

    /// End the stored session.
    Signout(SignoutArgs),

    /// Verify license tokens and look up plans.
    License(LicenseArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = bb_cli::resolve_config(cli.server.as_ref(), cli.license_endpoint.as_ref())?;
    tracing::debug!(
        server = %config.server_url,
        license_endpoint = %config.license_verify_url,
        "resolved endpoints"
    );

    match cli.command {
        Commands::Signin(args) => run_signin(&args, &Client::from_config(&config)?).await,
        Commands::Whoami(args) => run_whoami(&args, &Client::from_config(&config)?).await,
        Commands::Signout(args) => run_signout(&args, &Client::from_config(&config)?).await,
        Commands::License(args) => {
            let verifier = LicenseVerifier::with_endpoint(config.license_verify_url)?;
            run_license(&args, &verifier).await
        }
    }
}
