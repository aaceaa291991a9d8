//! Error types for the vSphere lookup crate.

use std::fmt;

/// Categorised error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VsphereErrorKind {
    /// VI/JSON endpoint unreachable or no active session
    ConnectionError,
    /// Authentication failed (401 / NotAuthenticated fault)
    AuthenticationError,
    /// Named object or managed object not found
    NotFound,
    /// Operation is not valid against this endpoint type
    Validation,
    /// HTTP / API error with status code
    ApiError(u16),
    /// vSphere fault carried in the response body (fault type name)
    Fault(String),
    /// Timeout
    Timeout,
    /// Permission denied (403)
    AccessDenied,
    /// JSON parse / deserialization error
    ParseError,
    /// Generic
    Other,
}

/// Crate error type carrying a kind + human-readable message.
#[derive(Debug, Clone)]
pub struct VsphereError {
    pub kind: VsphereErrorKind,
    pub message: String,
}

impl VsphereError {
    pub fn new(kind: VsphereErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(VsphereErrorKind::ConnectionError, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(VsphereErrorKind::AuthenticationError, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(VsphereErrorKind::NotFound, msg)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(VsphereErrorKind::Validation, msg)
    }

    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::new(VsphereErrorKind::ApiError(status), msg)
    }

    pub fn fault(fault_type: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(VsphereErrorKind::Fault(fault_type.into()), msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(VsphereErrorKind::ParseError, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(VsphereErrorKind::Timeout, msg)
    }

    /// Prefix the message with `ctx`, keeping the original kind.
    pub fn context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == VsphereErrorKind::NotFound
    }
}

impl fmt::Display for VsphereError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for VsphereError {}

impl From<VsphereError> for String {
    fn from(e: VsphereError) -> String {
        e.to_string()
    }
}

impl From<reqwest::Error> for VsphereError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("HTTP timeout: {e}"))
        } else if e.is_connect() {
            Self::connection(format!("Connection failed: {e}"))
        } else {
            Self::new(VsphereErrorKind::Other, format!("HTTP error: {e}"))
        }
    }
}

impl From<serde_json::Error> for VsphereError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {e}"))
    }
}

/// Convenience alias.
pub type VsphereResult<T> = Result<T, VsphereError>;
