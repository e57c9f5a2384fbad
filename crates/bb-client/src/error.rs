//! ByteBuilders client error types.

use std::error::Error as StdError;

/// Errors from ByteBuilders API calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Sign-in credentials were missing, unknown or wrong.
    ///
    /// The server does not tell an unknown user apart from a wrong password.
    #[error("user not found or password mismatch")]
    NotFound,
    /// No valid session or credential for an operation that requires one.
    #[error("unauthorized: no valid session or credentials")]
    Unauthorized,
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Server returned an unexpected non-2xx status.
    #[error("ByteBuilders API {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Request body serialization failed.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    /// Sign-in succeeded but the server set no session cookie.
    #[error("{endpoint} succeeded without setting a session cookie")]
    MissingCookies { endpoint: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

/// The sentinel kinds callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
}

impl ClientError {
    /// Sentinel kind of this error, if it is one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::NotFound => Some(ErrorKind::NotFound),
            Self::Unauthorized => Some(ErrorKind::Unauthorized),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ErrorKind::NotFound)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == Some(ErrorKind::Unauthorized)
    }
}

impl ErrorKind {
    /// Find the first sentinel kind anywhere in `err`'s source chain.
    ///
    /// Works through wrappers such as `anyhow::Error` (via `as_ref()`) or
    /// outer error enums that keep a [`ClientError`] as their `source`.
    pub fn of(err: &(dyn StdError + 'static)) -> Option<Self> {
        let mut current = Some(err);
        while let Some(e) = current {
            if let Some(client) = e.downcast_ref::<ClientError>() {
                if let Some(kind) = client.kind() {
                    return Some(kind);
                }
            }
            current = e.source();
        }
        None
    }
}
