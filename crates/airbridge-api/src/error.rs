use thiserror::Error;

/// Top-level error type for the `airbridge-api` crate.
///
/// Covers every failure mode of the two cloud endpoints: the OAuth token
/// exchange and the device listing. `airbridge-core` maps these into its
/// own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The client-credentials exchange failed (network, non-2xx, or a body
    /// that is not a token response).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The device API rejected the bearer token (HTTP 401).
    #[error("Access token rejected by the device API")]
    Unauthorized,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Device API ──────────────────────────────────────────────────
    /// Non-2xx response from the device listing endpoint.
    #[error("Device API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on the
    /// next poll.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status associated with the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Truncate a response body for inclusion in error messages and logs.
pub(crate) fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
