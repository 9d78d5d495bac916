use std::path::PathBuf;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, LdError>;

/// Every failure an operation can surface to its caller.
#[derive(Debug, Error)]
pub enum LdError {
    /// Caller supplied missing or malformed input. Raised before any network call.
    #[error("{0}")]
    Validation(String),

    /// The remote service answered 404 for the targeted resource.
    #[error("{api}: not found: {message} (see {docs})")]
    NotFound {
        api: &'static str,
        message: String,
        docs: String,
    },

    /// Any other non-success outcome of a remote call. `status` is `None` when
    /// the request never produced an HTTP response.
    #[error("{api} failed{}: {message} (see {docs})", status_suffix(.status))]
    RemoteApi {
        api: &'static str,
        status: Option<u16>,
        message: String,
        docs: String,
    },

    /// A list-then-filter lookup matched zero or several items.
    #[error("{api}: {message} (see {docs})")]
    AmbiguousMatch {
        api: &'static str,
        message: String,
        docs: String,
    },

    /// A sub-document addressed by a JSON pointer is absent from a resource.
    #[error("resource '{key}' has no value at '{scope}'")]
    MissingScope { key: String, scope: String },

    #[error("patch could not be applied at '{path}': {reason}")]
    Patch { path: String, reason: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" with status {}", s))
        .unwrap_or_default()
}

impl LdError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Operation name attached to remote failures, if any.
    pub fn api(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { api, .. }
            | Self::RemoteApi { api, .. }
            | Self::AmbiguousMatch { api, .. } => Some(*api),
            _ => None,
        }
    }

    /// Documentation reference attached to remote failures, if any.
    pub fn docs(&self) -> Option<&str> {
        match self {
            Self::NotFound { docs, .. }
            | Self::RemoteApi { docs, .. }
            | Self::AmbiguousMatch { docs, .. } => Some(docs.as_str()),
            _ => None,
        }
    }
}
