// SPDX-License-Identifier: Apache-2.0
//! Route definitions for the ByteBuilders API stub.
//!
//! Implements the endpoints that `bb-client` calls, with responses that
//! deserialize cleanly into the client's types.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use axum_extra::headers::{authorization::Basic, Authorization};
use axum_extra::TypedHeader;
use serde::Deserialize;
use serde_json::json;

use crate::store::{AppState, StubUser};
use crate::{CSRF_COOKIE, SESSION_COOKIE};

/// Build the complete router with all stub routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/user/signin", post(signin))
        .route("/api/v1/user/signout", post(signout))
        .route("/api/v1/user", get(current_user))
        .route("/api/v1/user/licenses/verify", post(verify_license))
        // Fallback: 501 Not Implemented
        .fallback(not_implemented)
        .with_state(state)
}

fn message(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "message": msg }))).into_response()
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> StatusCode {
    StatusCode::OK
}

// ── Sessions ────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInBody {
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    password: String,
}

async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignInBody>,
) -> Response {
    let Some(user) = state.check_password(&body.user_name, &body.password) else {
        tracing::debug!(user = %body.user_name, "sign-in rejected");
        return message(
            StatusCode::NOT_FOUND,
            "user does not exist or password mismatch",
        );
    };

    let session_id = state.open_session(&user.login);
    let csrf = uuid::Uuid::new_v4().simple().to_string();
    let jar = jar
        .add(
            Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true),
        )
        .add(Cookie::build((CSRF_COOKIE, csrf)).path("/"));

    tracing::debug!(user = %user.login, "session opened");
    (jar, Json(user.to_json())).into_response()
}

async fn signout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(session) = jar.get(SESSION_COOKIE) {
        if state.close_session(session.value()) {
            tracing::debug!("session closed");
        }
    }
    let jar = jar
        .remove(Cookie::build(SESSION_COOKIE).path("/"))
        .remove(Cookie::build(CSRF_COOKIE).path("/"));
    (jar, StatusCode::OK).into_response()
}

/// Resolve the caller from the session cookie, then from HTTP Basic.
fn authenticate(
    state: &AppState,
    jar: &CookieJar,
    basic: Option<&Authorization<Basic>>,
) -> Option<StubUser> {
    if let Some(user) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| state.session_user(c.value()))
    {
        return Some(user);
    }
    basic.and_then(|auth| state.check_password(auth.username(), auth.password()))
}

async fn current_user(
    State(state): State<AppState>,
    jar: CookieJar,
    basic: Option<TypedHeader<Authorization<Basic>>>,
) -> Response {
    match authenticate(&state, &jar, basic.as_ref().map(|TypedHeader(auth)| auth)) {
        Some(user) => Json(user.to_json()).into_response(),
        None => message(StatusCode::UNAUTHORIZED, "unauthorized"),
    }
}

// ── Licenses ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct VerifyBody {
    raw: String,
}

async fn verify_license(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<VerifyBody>,
) -> Response {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("JWT "));
    if bearer != Some(body.raw.as_str()) {
        return message(StatusCode::UNAUTHORIZED, "license token missing from Authorization header");
    }

    match state.license(&body.raw) {
        Some(license) => Json(license).into_response(),
        None => message(StatusCode::NOT_FOUND, "license not found"),
    }
}

// ── Fallback ────────────────────────────────────────────────────────

async fn not_implemented() -> Response {
    message(StatusCode::NOT_IMPLEMENTED, "not implemented by bb-stub")
}
