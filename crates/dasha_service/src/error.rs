//! Errors at the calculation-service boundary.

use std::time::Duration;

use dasha_base::DashaError;
use dasha_base::dasha::NodeId;
use thiserror::Error;

/// Errors from fetching and applying dasha levels.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Dasha(#[from] DashaError),

    #[error("node {0} is not in the current view")]
    NotInView(NodeId),

    #[error("breadcrumb depth {requested} is beyond the current path ({path_len})")]
    InvalidBreadcrumb { requested: usize, path_len: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("fetch task ended without a result: {0}")]
    Task(String),
}

impl ServiceError {
    /// Whether a retry of the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) | Self::Task(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
