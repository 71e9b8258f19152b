use std::fmt;

use thiserror::Error;

/// Which of the two drive requests failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchStage {
    Metadata,
    Content,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Metadata => f.write_str("metadata"),
            FetchStage::Content => f.write_str("content"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("no PKCE verifier in session; restart sign-in")]
    MissingVerifier,

    #[error("authorization callback state does not match the stored state")]
    StateMismatch,

    #[error("authorization denied: {error}: {description}")]
    AuthorizationDenied { error: String, description: String },

    #[error("token exchange failed with HTTP {status}: {body}")]
    TokenExchangeFailed { status: u16, body: String },

    #[error("file {stage} request failed with HTTP {status}")]
    FileFetchError { stage: FetchStage, status: u16 },

    #[error("drive item metadata has no download URL")]
    MissingDownloadUrl,

    #[error("invalid export: {0}")]
    InvalidExport(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl DashboardError {
    /// True when the drive rejected the bearer token, meaning the cached
    /// token should be dropped before trying again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            DashboardError::FileFetchError { status: 401, .. }
        )
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, DashboardError>;
