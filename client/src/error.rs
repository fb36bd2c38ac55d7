//! Error taxonomy for CIC/TMS operations.

use std::fmt;

use thiserror::Error;

/// Result type for CIC operations.
pub type CicResult<T> = Result<T, CicError>;

/// The two TMS resource families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    System,
    Tenant,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "systems",
            Self::Tenant => "tenants",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller was trying to do when permission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Lookup,
    Update,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lookup => f.write_str("look up"),
            Self::Update => f.write_str("update"),
        }
    }
}

/// A non-2xx response with its body read eagerly, so diagnostics survive
/// after the underlying response is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HTTP {} from {} {}, Body: {}",
            self.status, self.method, self.url, self.body
        )
    }
}

/// Errors from CIC/TMS operations.
#[derive(Debug, Error)]
pub enum CicError {
    /// Login rejected the credentials (HTTP 401).
    #[error("could not log on to {url}: {body}")]
    AuthFailure { url: String, body: String },

    /// Authenticated, but not allowed (HTTP 403).
    #[error("user {user} has no permission to {access} {resource} '{target}' in {url}: {body}")]
    PermissionDenied {
        user: String,
        url: String,
        access: Access,
        resource: Resource,
        target: String,
        body: String,
    },

    /// The record does not exist (HTTP 404).
    #[error("{resource} '{identifier}' not found in TMS: {body}")]
    NotFound {
        resource: Resource,
        identifier: String,
        body: String,
    },

    /// HTTP 404 whose body reports a communication failure rather than
    /// an absent record.
    #[error("{resource} '{identifier}' could not be looked up because of a network/communication error: {body}")]
    Unreachable {
        resource: Resource,
        identifier: String,
        body: String,
    },

    #[error("{resource} '{identifier}' already exists")]
    AlreadyExists {
        resource: Resource,
        identifier: String,
    },

    #[error("cannot create {resource} from an empty payload")]
    EmptyPayload { resource: Resource },

    /// The server accepted the update but did not echo the field back,
    /// usually an invalid parameter name.
    #[error("{resource} metadata update failed: parameter '{field}' not written, maybe invalid parameter")]
    NotWritten { resource: Resource, field: String },

    /// The server echoed a different value than the one sent.
    #[error("{resource} metadata update failed: parameter '{field}' written but different return value: {expected} != {actual}")]
    Mismatch {
        resource: Resource,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("{resource} record is missing field '{field}'")]
    MissingField { resource: Resource, field: String },

    #[error("unexpected HTTP status {status} when calling {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Any other non-2xx response.
    #[error("{0}")]
    Http(HttpFailure),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to encode request body for {url}: {source}")]
    Encode {
        url: String,
        source: serde_json::Error,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}

impl CicError {
    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthFailure { .. } => Some(401),
            Self::PermissionDenied { .. } => Some(403),
            Self::NotFound { .. } | Self::Unreachable { .. } => Some(404),
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Http(failure) => Some(failure.status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Decide whether a 404 body from a system lookup means the system truly
/// does not exist.
///
/// TMS answers with `{"details": [{"details": {...}}, ...]}`. The system is
/// genuinely absent when that structure is present and no entry carries a
/// nested `error` field. A body that cannot be read that way points at a
/// transport problem instead.
pub fn is_genuinely_absent(body: &str) -> bool {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    let Some(entries) = json.get("details").and_then(|d| d.as_array()) else {
        return false;
    };
    let Some(first) = entries.first() else {
        return false;
    };
    if first.get("details").is_none() {
        return false;
    }
    !entries.iter().any(|entry| {
        entry
            .get("details")
            .and_then(|d| d.as_object())
            .is_some_and(|d| d.contains_key("error"))
    })
}
