// Legacy API HTTP client
//
// Wraps `reqwest::Client` with the `/api/V1/<operation>.lua` URL scheme,
// verb selection by operation name, optional Basic auth, and envelope
// unwrapping. Endpoint methods are implemented as inherent methods in
// `stream.rs` to keep this module focused on transport mechanics.

use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::auth::Credentials;
use crate::error::Error;
use crate::legacy::models::LegacyResponse;
use crate::transport::{self, RequestKind, TransportConfig};

/// Raw HTTP client for the encoder's legacy `.lua` API.
///
/// Stateless apart from the optional credentials: every call carries Basic
/// auth when both username and password are configured.
pub struct LegacyClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl LegacyClient {
    /// Create a client for the device at `address` (host or `host:port`).
    pub fn new(
        address: &str,
        credentials: Option<Credentials>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = transport::device_base_url(address)?;
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, credentials))
    }

    /// Create a legacy client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            http,
            base_url,
            credentials,
        }
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/api/V1/{name}.lua`
    pub(crate) fn operation_url(&self, name: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("api/V1/{name}.lua"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send one operation and parse the envelope without judging `Result`.
    ///
    /// `set…` operations go out as `POST` with a form body, everything
    /// else as `GET` with a query string.
    pub async fn request<T: DeserializeOwned>(
        &self,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<LegacyResponse<T>, Error> {
        let url = self.operation_url(name)?;
        let kind = RequestKind::for_operation(name);
        debug!(operation = name, method = %kind.method(), "{url}");

        let mut builder = match kind {
            RequestKind::Read => self.http.get(url).query(params),
            RequestKind::Write => self.http.post(url).form(params),
        };
        if let Some(ref creds) = self.credentials {
            builder = creds.apply_basic(builder);
        }

        let resp = builder.send().await?;
        let resp = transport::ensure_success(name, resp)?;
        let body = resp.text().await?;
        trace!(operation = name, body = %transport::body_preview(&body), "legacy response");

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!(
                "{e} (body preview: {:?})",
                transport::body_preview(&body)
            ),
            body: body.clone(),
        })
    }

    /// Send one operation and return its `Data`, failing on a non-200
    /// `Result` or a missing payload.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<T, Error> {
        let envelope = self.request::<T>(name, params).await?;
        check_envelope(name, &envelope)?;
        envelope.data.ok_or_else(|| Error::Envelope {
            operation: name.to_owned(),
            code: envelope.result.to_string(),
            message: "response carried no Data".into(),
        })
    }

    /// Send one operation where only the `Result` code matters.
    pub(crate) async fn execute(&self, name: &str, params: &[(&str, &str)]) -> Result<(), Error> {
        let envelope = self.request::<serde_json::Value>(name, params).await?;
        check_envelope(name, &envelope)
    }
}

fn check_envelope<T>(name: &str, envelope: &LegacyResponse<T>) -> Result<(), Error> {
    if envelope.is_success() {
        return Ok(());
    }
    Err(Error::Envelope {
        operation: name.to_owned(),
        code: envelope.result.to_string(),
        message: envelope.status_text(),
    })
}
