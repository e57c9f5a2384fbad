// SPDX-License-Identifier: Apache-2.0
//! # bb-stub -- In-memory ByteBuilders API stub
//!
//! Serves the session and license-verification endpoints `bb-client` calls,
//! backed by in-memory DashMaps with no persistence. Used as the test server
//! for integration tests and as a standalone development server.
//!
//! ```no_run
//! # async fn demo() -> std::io::Result<()> {
//! let server = bb_stub::spawn(bb_stub::AppState::new()).await?;
//! println!("stub listening on {}", server.url());
//! # Ok(())
//! # }
//! ```

pub mod routes;
pub mod store;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use routes::router;
pub use store::{demo_license, AppState, StubUser};

/// Login of the account every fresh [`AppState`] is seeded with.
pub const TEST_SERVER_USER: &str = "appscode";

/// Password of [`TEST_SERVER_USER`].
pub const TEST_SERVER_PASSWORD: &str = "password";

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "bb_session";

/// Anti-forgery cookie issued alongside the session.
pub const CSRF_COOKIE: &str = "_csrf";

/// A stub bound to a local port. The server stops when this is dropped.
pub struct StubServer {
    addr: SocketAddr,
    state: AppState,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:53124`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve `state` on an ephemeral port of `127.0.0.1`.
pub async fn spawn(state: AppState) -> std::io::Result<StubServer> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    let app = router(state.clone());

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            tracing::error!("bb-stub server error: {e}");
        }
    });
    tracing::debug!("bb-stub listening on {addr}");

    Ok(StubServer {
        addr,
        state,
        handle,
    })
}
