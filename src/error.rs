//! Error types shared across the pipeline.

use thiserror::Error;

/// Failures talking to an external geocoding or routing provider.
///
/// "No result" answers (zero candidates, no drivable route) are not errors;
/// providers report those as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),
    #[error("provider rate limit exceeded")]
    RateLimited,
    #[error("provider returned HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("request rejected by provider: {0}")]
    Rejected(String),
    #[error("unsupported request: {0}")]
    Unsupported(String),
}

impl ProviderError {
    /// Transient failures leave the pair unchecked so the next run retries it.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited => true,
            Self::Status { code, .. } => *code == 429 || *code >= 500,
            Self::InvalidResponse(_) | Self::Rejected(_) | Self::Unsupported(_) => false,
        }
    }
}

impl From<ureq::Error> for ProviderError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(429, _) => Self::RateLimited,
            ureq::Error::Status(code, response) => Self::Status {
                code,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => Self::Network(transport.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("unknown slug: {0}")]
    UnknownSlug(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
