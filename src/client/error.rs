//! Error type for Github Client

use reqwest::{header::HeaderMap, Method, StatusCode};
use serde::Deserialize;
use std::{borrow::Cow, collections::BTreeSet, fmt, io};
use thiserror::Error;

use super::HEADER_OTP;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("username and password must both be non-empty")]
    InvalidCredentials,

    #[error("token must be non-empty")]
    InvalidToken,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(Box<ApiError>),

    #[error("two-factor authentication code required")]
    TwoFactorRequired,

    #[error("insufficient scope, missing {missing:?}")]
    InsufficientScope { missing: BTreeSet<String> },

    #[error("unsupported verb `{0}`")]
    UnsupportedVerb(Method),

    #[error("invalid scope `{0}`")]
    InvalidScope(String),

    #[error("`{0}` cannot be used as a path segment")]
    InvalidPathSegment(String),

    #[error("client is not authenticated with a token")]
    NotAuthenticated,

    #[error("client is already authenticated with a token")]
    AlreadyAuthenticated,

    #[error("{0}")]
    Api(Box<ApiError>),

    #[error("Io error")]
    Io(#[from] io::Error),

    #[error("reqwest error")]
    Reqwest(#[from] reqwest::Error),

    #[error("json error")]
    Json(#[from] serde_json::Error),

    #[error("toml parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("url error")]
    Url(#[from] url::ParseError),

    #[error("`{0}`")]
    Message(Cow<'static, str>),
}

impl Error {
    /// Coarse category of this error. Errors raised before any network
    /// activity have no category.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Api(e) | Error::AuthenticationFailed(e) => Some(e.kind),
            Error::Reqwest(_) | Error::Io(_) => Some(ErrorKind::TransportError),
            _ => None,
        }
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) | Error::AuthenticationFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ApiError> for Error {
    fn from(error: ApiError) -> Self {
        Error::Api(Box::new(error))
    }
}

impl From<&'static str> for Error {
    fn from(error: &'static str) -> Self {
        Error::Message(error.into())
    }
}

impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Message(error.into())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    RateLimited,
    ClientError,
    ServerError,
    TransportError,
    /// A 1xx, 2xx or 3xx status the caller did not ask for
    UnexpectedStatus,
}

/// A request that reached Github but came back with a status outside of the
/// expected set.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub headers: HeaderMap,
    pub body: String,
    pub details: Option<GithubClientError>,
}

impl ApiError {
    pub(crate) fn new(
        status: StatusCode,
        kind: ErrorKind,
        headers: HeaderMap,
        body: String,
    ) -> Self {
        let details = serde_json::from_str(&body).ok();
        Self {
            status,
            kind,
            headers,
            body,
            details,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.details.as_ref().and_then(|d| d.message.as_deref())
    }

    /// Github answers a password login on an account with 2FA enabled with
    /// `X-GitHub-OTP: required; <method>`
    pub fn requires_otp(&self) -> bool {
        self.headers
            .get(HEADER_OTP)
            .and_then(|h| h.to_str().ok())
            .map(|v| v.contains("required"))
            .unwrap_or(false)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{:?} ({}): {}", self.kind, self.status, message),
            None => write!(f, "{:?} ({})", self.kind, self.status),
        }
    }
}

// Github Error Responses
// https://developer.github.com/v3/#client-errors
#[derive(Debug, Deserialize)]
pub struct GithubClientError {
    pub message: Option<String>,
    pub errors: Option<Vec<GithubClientErrorType>>,
    pub documentation_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GithubClientErrorType {
    Message(String),
    Code {
        resource: String,
        field: String,
        code: String,
    },
}
