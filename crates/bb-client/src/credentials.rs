//! Credential modes a [`Client`](crate::Client) can carry.
//!
//! Exactly one mode is active per client. Secrets never reach `Debug`
//! output.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// One cookie issued by the sign-in endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Cookie set returned by a successful sign-in.
///
/// Owned by the caller and handed back via
/// [`Client::with_cookies`](crate::Client::with_cookies). Serializable so
/// it can be persisted between processes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCookies(Vec<SessionCookie>);

impl SessionCookies {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self(cookies)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionCookie> {
        self.0.iter()
    }

    /// Value of the cookie called `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Render as a `Cookie` request header value (`a=1; b=2`).
    pub fn header_value(&self) -> String {
        self.0
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Collect the cookies a response set. A later cookie with the same
    /// name replaces an earlier one.
    pub(crate) fn from_response(resp: &reqwest::Response) -> Self {
        let mut cookies: Vec<SessionCookie> = Vec::new();
        for c in resp.cookies() {
            let cookie = SessionCookie {
                name: c.name().to_string(),
                value: c.value().to_string(),
            };
            match cookies.iter_mut().find(|existing| existing.name == cookie.name) {
                Some(existing) => *existing = cookie,
                None => cookies.push(cookie),
            }
        }
        Self(cookies)
    }
}

impl FromIterator<SessionCookie> for SessionCookies {
    fn from_iter<I: IntoIterator<Item = SessionCookie>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Credential mode attached to a client.
#[derive(Clone, Default)]
pub enum Credentials {
    /// Anonymous; identity-requiring calls fail with `Unauthorized`.
    #[default]
    None,
    /// Session cookies from a prior sign-in.
    Cookies(SessionCookies),
    /// HTTP Basic credentials sent on every request.
    BasicAuth {
        username: String,
        password: Zeroizing<String>,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Cookies(cookies) => f.debug_tuple("Cookies").field(cookies).finish(),
            Self::BasicAuth { username, .. } => f
                .debug_struct("BasicAuth")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

impl Credentials {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Attach this credential to an outgoing request.
    pub(crate) fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::None => req,
            Self::Cookies(cookies) if cookies.is_empty() => req,
            Self::Cookies(cookies) => req.header(reqwest::header::COOKIE, cookies.header_value()),
            Self::BasicAuth { username, password } => {
                req.basic_auth(username, Some(password.as_str()))
            }
        }
    }
}
