// Shared transport configuration and request classification.
//
// Both device clients build their `reqwest::Client` here. Neither client
// retries: a failed request surfaces immediately and the engine decides
// what happens next.

use std::time::Duration;

use reqwest::Method;
use url::Url;

use crate::error::Error;

/// Default `User-Agent` sent to the device.
pub const DEFAULT_USER_AGENT: &str = concat!("kilosync/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
///
/// No request timeout is applied unless one is configured; a device that
/// accepts the connection but never answers stalls the caller.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl TransportConfig {
    /// Set a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder().user_agent(&self.user_agent);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder.build().map_err(Error::Network)
    }
}

/// Root URL for a device address (`http://<address>/`).
///
/// Accepts a bare host or `host:port`; an explicit `http://` prefix is
/// tolerated.
pub fn device_base_url(address: &str) -> Result<Url, Error> {
    let host = address.trim().trim_end_matches('/');
    let host = host.strip_prefix("http://").unwrap_or(host);
    Ok(Url::parse(&format!("http://{host}/"))?)
}

/// How an operation travels over the wire, decided by its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Parameter-bearing `GET`.
    Read,
    /// Body-bearing `POST`.
    Write,
}

impl RequestKind {
    const WRITE_PREFIX: &str = "set";

    /// Operations whose name starts with `set` mutate the device.
    pub fn for_operation(name: &str) -> Self {
        if name.starts_with(Self::WRITE_PREFIX) {
            Self::Write
        } else {
            Self::Read
        }
    }

    pub fn method(self) -> Method {
        match self {
            Self::Read => Method::GET,
            Self::Write => Method::POST,
        }
    }
}

/// Reject any response outside 200-299 as [`Error::HttpStatus`].
pub(crate) fn ensure_success(
    operation: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    Err(Error::HttpStatus {
        operation: operation.to_owned(),
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_owned(),
    })
}

/// Truncated body for error messages.
pub(crate) fn body_preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_prefix_selects_write() {
        assert_eq!(
            RequestKind::for_operation("setStreamService"),
            RequestKind::Write
        );
        assert_eq!(RequestKind::for_operation("startRecord"), RequestKind::Read);
        assert_eq!(RequestKind::for_operation("deviceInfo"), RequestKind::Read);
        assert_eq!(RequestKind::Write.method(), Method::POST);
        assert_eq!(RequestKind::Read.method(), Method::GET);
    }

    #[test]
    fn base_url_accepts_host_and_port() {
        let url = device_base_url("192.168.1.50").unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.50/");

        let url = device_base_url("encoder.local:8080/").unwrap();
        assert_eq!(url.as_str(), "http://encoder.local:8080/");

        let url = device_base_url("http://10.0.0.2").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.2/");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "é".repeat(150);
        let preview = body_preview(&body);
        assert!(preview.len() <= 200);
        assert!(body.starts_with(preview));
    }
}
