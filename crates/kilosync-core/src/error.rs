// ── Core error types ──
//
// User-facing errors from kilosync-core. These are NOT API errors —
// they represent what the engine reports to its consumers.

use kilosync_api::Error as ApiError;
use thiserror::Error;

/// Unified error type for the engine layer.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection ───────────────────────────────────────────────
    #[error("Cannot reach device at {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("No active device session")]
    NotConnected,

    // ── Device responses ─────────────────────────────────────────
    #[error("HTTP {status} {status_text} from '{operation}'")]
    Http {
        operation: String,
        status: u16,
        status_text: String,
    },

    /// A well-formed response reporting a logical failure. The engine
    /// treats these as "no data this cycle" rather than a cycle failure.
    #[error("Device returned no usable data for '{operation}': {message}")]
    Envelope { operation: String, message: String },

    // ── Commands ─────────────────────────────────────────────────
    #[error("Service '{service}' not found on {stream} stream")]
    ServiceNotFound { stream: String, service: String },

    #[error("Operation '{operation}' requires {required}")]
    Unsupported { operation: String, required: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    // ── Configuration ────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal ─────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Envelope-level failures: the device answered, but with nothing usable.
    pub fn is_envelope(&self) -> bool {
        matches!(self, Self::Envelope { .. })
    }

    /// The device rejected our credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

impl From<ApiError> for CoreError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::HttpStatus { status: 401, .. } => CoreError::AuthenticationFailed {
                message: "device returned 401 Unauthorized".into(),
            },
            ApiError::HttpStatus {
                operation,
                status,
                status_text,
            } => CoreError::Http {
                operation,
                status,
                status_text,
            },
            ApiError::Envelope {
                operation,
                code,
                message,
            } => CoreError::Envelope {
                operation,
                message: if message.is_empty() {
                    format!("result {code}")
                } else {
                    format!("result {code}: {message}")
                },
            },
            ApiError::Network(ref e) => CoreError::ConnectionFailed {
                address: e
                    .url()
                    .and_then(|u| u.host_str())
                    .unwrap_or("unknown")
                    .into(),
                reason: err.to_string(),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid device address: {e}"),
            },
            ApiError::Deserialization { message, .. } => CoreError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_401_maps_to_auth() {
        let err: CoreError = ApiError::HttpStatus {
            operation: "deviceInfo".into(),
            status: 401,
            status_text: "Unauthorized".into(),
        }
        .into();
        assert!(err.is_auth());
    }

    #[test]
    fn api_envelope_stays_envelope() {
        let err: CoreError = ApiError::Envelope {
            operation: "getStreamService".into(),
            code: "500".into(),
            message: String::new(),
        }
        .into();
        assert!(err.is_envelope());
        assert_eq!(
            err.to_string(),
            "Device returned no usable data for 'getStreamService': result 500"
        );
    }
}
