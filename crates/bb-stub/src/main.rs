// SPDX-License-Identifier: Apache-2.0
//! ByteBuilders API stub server -- standalone development server.
//!
//! Storage is in-memory (DashMap) with no persistence; data is lost on
//! restart. The test account `appscode` / `password` is always present.
//!
//! Environment:
//! - `BB_STUB_PORT` (default: 8090)
//! - `BB_STUB_LICENSE_TOKEN`: when set, this token verifies as an active
//!   one-year license for `BB_STUB_CLUSTER` (default: `demo-cluster`),
//!   product `demo-product`, owner 1, plan `demo-plan`.

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use bb_stub::{demo_license, router, AppState};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("BB_STUB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8090);

    let state = AppState::new();
    if let Ok(token) = std::env::var("BB_STUB_LICENSE_TOKEN") {
        let cluster =
            std::env::var("BB_STUB_CLUSTER").unwrap_or_else(|_| "demo-cluster".to_string());
        let license = demo_license(&cluster, "demo-product", 1, "demo-plan", chrono::Utc::now());
        state.issue_license(token, license);
        tracing::info!(cluster = %cluster, "issued demo license");
    }
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("bb-stub listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await
}
