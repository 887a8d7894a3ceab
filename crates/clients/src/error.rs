/// Errors from the collaborator API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The backend answered 2xx but reported `success: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The request was not sent because its payload is invalid.
    #[error("Invalid request: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Rejected(_) | Self::InvalidInput(_) => false,
        }
    }

    /// The backend does not know the requested entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}
