use thiserror::Error;

/// Top-level error type for the `kilosync-api` crate.
///
/// Covers every failure mode of both device generations: transport,
/// HTTP status, the legacy `Result` envelope, and login.
/// `kilosync-core` maps these into engine-level outcomes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected by the device, or credentials missing for a login.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// DNS failure, refused connection, timeout, broken body.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Any HTTP status outside 200-299.
    #[error("HTTP {status} {status_text} from '{operation}'")]
    HttpStatus {
        operation: String,
        status: u16,
        status_text: String,
    },

    // ── Device envelope ─────────────────────────────────────────────
    /// The device answered with HTTP 200 but reported a logical failure
    /// (`Result != 200` on the legacy API, or a missing `Data` payload).
    #[error("Device reported failure for '{operation}' ({code}): {message}")]
    Envelope {
        operation: String,
        code: String,
        message: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the device refused our credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::HttpStatus { status: 401, .. }
        )
    }

    /// Returns `true` for a well-formed response whose envelope reports failure.
    pub fn is_envelope(&self) -> bool {
        matches!(self, Self::Envelope { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_covers_login_and_401() {
        let login = Error::Authentication {
            message: "bad password".into(),
        };
        let status = Error::HttpStatus {
            operation: "deviceInfo".into(),
            status: 401,
            status_text: "Unauthorized".into(),
        };
        let other = Error::HttpStatus {
            operation: "deviceInfo".into(),
            status: 404,
            status_text: "Not Found".into(),
        };

        assert!(login.is_unauthorized());
        assert!(status.is_unauthorized());
        assert!(!other.is_unauthorized());
        assert!(!other.is_envelope());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::HttpStatus {
            operation: "getStreamService".into(),
            status: 503,
            status_text: "Service Unavailable".into(),
        };
        assert!(err.is_transient());

        let envelope = Error::Envelope {
            operation: "getStreamService".into(),
            code: "500".into(),
            message: "busy".into(),
        };
        assert!(!envelope.is_transient());
        assert!(envelope.is_envelope());
    }
}
