//! Error types for the StreamGate registry, stream engine, and gateway.

use thiserror::Error;

/// Failures reported by a remote collaborator (streams ledger or stream source).
///
/// The core never retries these; retry policy belongs to the collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// JSON-RPC protocol-level error returned by the remote node.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Connection/send/receive failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not complete within the caller's bound.
    #[error("remote call timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The upstream connection closed while a call or feed was outstanding.
    #[error("remote stream closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// Errors from the durable key-value storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// Errors from the schema registry, codec, and stores.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Schema label '{label}' not found")]
    LabelNotFound { label: String },

    #[error("Version '{version}' of '{label}' not found")]
    VersionNotFound { label: String, version: String },

    #[error("values missing field '{field}'")]
    MissingField { field: String },

    #[error("encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Remote registry failure: {0}")]
    Remote(#[from] RemoteError),
}

/// Errors from the subscription registry.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Subscription '{id}' not found")]
    SubscriptionNotFound { id: String },

    #[error("Upstream failure: {0}")]
    Remote(#[from] RemoteError),
}

/// Failure to push a frame to one downstream client.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("client {id} disconnected")]
    Disconnected { id: u64 },

    #[error("client {id} queue is full")]
    Backlogged { id: u64 },

    #[error("{0}")]
    Other(String),
}

/// The boundary error taxonomy reported to gateway callers as
/// `{ ok: false, error }`.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required request field is missing. The message is the wire code.
    #[error("{0}")]
    Validation(String),

    /// Label, version, or subscription absent. The message is the wire code.
    #[error("{0}")]
    NotFound(String),

    #[error("values missing field '{field}'")]
    MissingField { field: String },

    #[error("encoding failed: {reason}")]
    EncodingFailure { reason: String },

    #[error("schema version is deprecated")]
    VersionDeprecated,

    #[error("a write identity is required for set operations")]
    WalletRequired,

    #[error("{0}")]
    Remote(RemoteError),

    /// A collaborator call exceeded the configured bound.
    #[error("remote call timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable code placed in the `error` field of a response.
    pub fn error_code(&self) -> String {
        match self {
            Self::Validation(code) | Self::NotFound(code) => code.clone(),
            Self::MissingField { field } => format!("values_missing_field_{field}"),
            Self::EncodingFailure { .. } => "encoding_failed_expected_hex".into(),
            Self::VersionDeprecated => "version_deprecated".into(),
            Self::WalletRequired => "wallet_required_set_operations".into(),
            Self::Remote(e) => e.to_string(),
            Self::Timeout { .. } => "remote_timeout".into(),
            Self::Storage(msg) | Self::Internal(msg) => msg.clone(),
        }
    }

    /// Returns `true` for errors caused by the caller's request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound(_)
                | Self::MissingField { .. }
                | Self::EncodingFailure { .. }
                | Self::VersionDeprecated
                | Self::WalletRequired
        )
    }
}

impl From<RemoteError> for GatewayError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Timeout { ms } => Self::Timeout { ms },
            other => Self::Remote(other),
        }
    }
}

impl From<RegistryError> for GatewayError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::LabelNotFound { .. } => Self::NotFound("not_found".into()),
            RegistryError::VersionNotFound { .. } => Self::NotFound("version_not_found".into()),
            RegistryError::MissingField { field } => Self::MissingField { field },
            RegistryError::EncodingFailed { reason } => Self::EncodingFailure { reason },
            RegistryError::Remote(e) => e.into(),
            RegistryError::Storage(e) => Self::Storage(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StreamError> for GatewayError {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::SubscriptionNotFound { .. } => Self::NotFound("not_found".into()),
            StreamError::Remote(e) => e.into(),
        }
    }
}
