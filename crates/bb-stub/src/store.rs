// SPDX-License-Identifier: Apache-2.0
//! In-memory storage backend using DashMap.
//!
//! Users are keyed by login, sessions by session id, licenses by the raw
//! token the verification endpoint receives.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{TEST_SERVER_PASSWORD, TEST_SERVER_USER};

/// A registered account.
#[derive(Debug, Clone)]
pub struct StubUser {
    pub id: i64,
    pub login: String,
    pub password: String,
    pub email: String,
}

impl StubUser {
    /// JSON shape of `GET /api/v1/user`.
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "login": self.login,
            "full_name": "",
            "email": self.email,
            "avatar_url": format!("https://byte.builders/avatars/{}", self.id)
        })
    }
}

/// Inner storage holding all DashMaps.
struct Inner {
    next_user_id: AtomicI64,
    users: DashMap<String, StubUser>,
    sessions: DashMap<String, String>,
    licenses: DashMap<String, Value>,
}

/// Shared application state holding all in-memory stores.
///
/// Cheaply cloneable via `Arc`; all clones share the same data.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Empty store seeded with the test account.
    pub fn new() -> Self {
        let state = Self {
            inner: Arc::new(Inner {
                next_user_id: AtomicI64::new(1),
                users: DashMap::new(),
                sessions: DashMap::new(),
                licenses: DashMap::new(),
            }),
        };
        state.add_user(TEST_SERVER_USER, TEST_SERVER_PASSWORD);
        state
    }

    /// Register `login` with `password`, replacing any existing account.
    pub fn add_user(&self, login: &str, password: &str) -> StubUser {
        let id = self.inner.next_user_id.fetch_add(1, Ordering::SeqCst);
        let user = StubUser {
            id,
            login: login.to_string(),
            password: password.to_string(),
            email: format!("{login}@byte.builders"),
        };
        self.inner.users.insert(login.to_string(), user.clone());
        user
    }

    /// The account `login` if `password` matches.
    pub fn check_password(&self, login: &str, password: &str) -> Option<StubUser> {
        self.inner
            .users
            .get(login)
            .filter(|u| u.password == password)
            .map(|u| u.value().clone())
    }

    pub fn user(&self, login: &str) -> Option<StubUser> {
        self.inner.users.get(login).map(|u| u.value().clone())
    }

    /// Start a session for `login` and return its id.
    pub fn open_session(&self, login: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.inner.sessions.insert(id.clone(), login.to_string());
        id
    }

    /// Account behind a live session.
    pub fn session_user(&self, session_id: &str) -> Option<StubUser> {
        let login = self.inner.sessions.get(session_id)?.value().clone();
        self.user(&login)
    }

    /// End a session. Returns whether it was live.
    pub fn close_session(&self, session_id: &str) -> bool {
        self.inner.sessions.remove(session_id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Make `token` verifiable, answering with `license`.
    pub fn issue_license(&self, token: impl Into<String>, license: Value) {
        self.inner.licenses.insert(token.into(), license);
    }

    pub fn license(&self, token: &str) -> Option<Value> {
        self.inner.licenses.get(token).map(|l| l.value().clone())
    }
}

/// An active one-year license for `cluster_id` with a single plan.
pub fn demo_license(
    cluster_id: &str,
    product_id: &str,
    owner_id: i64,
    plan_id: &str,
    now: DateTime<Utc>,
) -> Value {
    json!({
        "iss": "byte.builders",
        "sub": owner_id.to_string(),
        "aud": [cluster_id],
        "nbf": now.timestamp(),
        "iat": now.timestamp(),
        "exp": (now + Duration::days(365)).timestamp(),
        "status": "active",
        "subscribedPlans": [
            {"productId": product_id, "ownerId": owner_id, "planId": plan_id}
        ]
    })
}
