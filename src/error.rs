//! Error taxonomy.
//!
//! - [`ApiError`]: transport-level failure talking to the remote store.
//! - [`LoadError`]: the initial fetch for a container failed; the view shows
//!   an error until the next `open`.
//! - [`MutationError`]: a create/update/delete failed; surfaced as a
//!   transient notice, never unwinds other in-flight work.
//! - [`ValidationError`]: client-side rejection before any remote call.
//! - [`ConfigError`]: a configuration variable could not be parsed.

use crate::doc::{ContainerId, EntityKind, EntityRef};

/// Stable machine-readable code for user-facing errors.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

/// Errors produced talking to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status.
    #[error("store responded with status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_API_REQUEST",
            Self::Status { status: 404, .. } => "E_NOT_FOUND",
            Self::Status { .. } => "E_API_STATUS",
            Self::Parse(_) => "E_API_PARSE",
            Self::ClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("failed to load board {container}: {source}")]
    Fetch { container: ContainerId, source: ApiError },
}

impl ErrorCode for LoadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "E_LOAD",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("failed to create {kind}: {source}")]
    Create { kind: EntityKind, source: ApiError },

    #[error("failed to update {target}: {source}")]
    Update { target: EntityRef, source: ApiError },

    #[error("failed to delete {target}: {source}")]
    Delete { target: EntityRef, source: ApiError },

    #[error("board {op} failed: {source}")]
    Container { op: &'static str, source: ApiError },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ErrorCode for MutationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Create { .. } => "E_CREATE",
            Self::Update { .. } => "E_UPDATE",
            Self::Delete { .. } => "E_DELETE",
            Self::Container { .. } => "E_BOARD",
            Self::Validation(e) => e.error_code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title is required")]
    EmptyTitle,

    #[error("title is {len} characters; the limit is {max}")]
    TitleTooLong { len: usize, max: usize },

    #[error("board name is required")]
    EmptyContainerName,
}

impl ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "E_EMPTY_TITLE",
            Self::TitleTooLong { .. } => "E_TITLE_TOO_LONG",
            Self::EmptyContainerName => "E_EMPTY_BOARD_NAME",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Parse { var: &'static str, value: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "E_CONFIG",
        }
    }
}
