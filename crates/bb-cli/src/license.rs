//! # License Subcommand
//!
//! `bb license verify` prints the decoded license record; `bb license plan`
//! reports which plan, if any, covers a cluster/product/owner tuple.

use anyhow::{Context, Result};
use bb_client::LicenseVerifier;
use clap::{Args, Subcommand};

/// Exit code when a valid request finds no covering plan.
pub const EXIT_NOT_COVERED: u8 = 2;

/// Arguments for the `bb license` subcommand.
#[derive(Args, Debug)]
pub struct LicenseArgs {
    #[command(subcommand)]
    pub command: LicenseCommand,
}

/// License subcommands.
#[derive(Subcommand, Debug)]
pub enum LicenseCommand {
    /// Verify a license token and print the decoded license.
    Verify {
        /// The signed license token.
        token: String,
    },

    /// Print the plan covering a product on a cluster.
    Plan {
        /// The signed license token.
        token: String,
        /// Cluster identifier the license must be issued for.
        #[arg(long)]
        cluster: String,
        /// Product identifier.
        #[arg(long)]
        product: String,
        /// Numeric id of the product owner.
        #[arg(long)]
        owner: i64,
    },
}

/// Execute the license subcommand.
pub async fn run_license(args: &LicenseArgs, verifier: &LicenseVerifier) -> Result<u8> {
    match &args.command {
        LicenseCommand::Verify { token } => {
            let license = verifier
                .verify(token)
                .await
                .context("license verification failed")?;
            println!("{}", serde_json::to_string_pretty(&license)?);
            Ok(0)
        }
        LicenseCommand::Plan {
            token,
            cluster,
            product,
            owner,
        } => match verifier.license_plan(token, cluster, product, *owner).await {
            Some(plan) => {
                println!("{plan}");
                Ok(0)
            }
            None => {
                eprintln!("FAIL: no active plan covers {product} (owner {owner}) on {cluster}");
                Ok(EXIT_NOT_COVERED)
            }
        },
    }
}
