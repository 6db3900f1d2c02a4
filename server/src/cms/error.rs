//! Errors from the CMS API.

/// A failed CMS call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request exceeded its wall-clock limit. Never retried.
    #[error("CMS request timed out")]
    Timeout,

    /// Non-2xx response, or a 429 that outlived the retry budget.
    #[error("CMS responded {status}: {body}")]
    Http { status: u16, body: String },

    #[error("CMS network error: {0}")]
    Network(String),

    /// A 2xx response whose body lacks a field the call depends on.
    #[error("unexpected CMS response: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<super::TransportError> for ApiError {
    fn from(err: super::TransportError) -> Self {
        match err {
            super::TransportError::Timeout => ApiError::Timeout,
            super::TransportError::Network(msg) => ApiError::Network(msg),
        }
    }
}
