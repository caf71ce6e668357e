// Token API HTTP client
//
// Holds the session token obtained by `login()` and attaches it raw as the
// `Authorization` header. Every other call funnels through `dispatch`,
// which folds transport and HTTP failures into `TokenResponse::error` so a
// poll loop never has to unwind on a single bad request.

use std::sync::RwLock;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::auth::Credentials;
use crate::error::Error;
use crate::token::models::{
    LOGIN_PATH, LoginData, RawEnvelope, TokenResponse, TokenResult, VideoInterface,
};
use crate::transport::{self, TransportConfig};

/// HTTP client for the token-authenticated REST API of one device,
/// scoped to one video interface.
pub struct TokenClient {
    http: reqwest::Client,
    base_url: Url,
    interface: VideoInterface,
    credentials: Option<Credentials>,
    /// Session token from the last successful login. Memory only.
    auth_token: RwLock<Option<SecretString>>,
}

impl TokenClient {
    /// Create a client for the device at `address` (host or `host:port`).
    ///
    /// `credentials` are only used by [`login`](Self::login); pass `None`
    /// when the device has API authentication disabled.
    pub fn new(
        address: &str,
        interface: VideoInterface,
        credentials: Option<Credentials>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = transport::device_base_url(address)?;
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, interface, credentials))
    }

    /// Create a token client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        interface: VideoInterface,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            http,
            base_url,
            interface,
            credentials,
            auth_token: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn interface(&self) -> VideoInterface {
        self.interface
    }

    /// Whether credentials were configured (i.e. a login is expected).
    pub fn requires_login(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn has_token(&self) -> bool {
        self.auth_token
            .read()
            .expect("token lock poisoned")
            .is_some()
    }

    // ── Login ────────────────────────────────────────────────────────

    /// Exchange the configured credentials for a session token.
    ///
    /// Unlike every other call this one propagates: missing credentials or
    /// a rejected login yield [`Error::Authentication`], an unreachable
    /// device yields [`Error::Network`].
    pub async fn login(&self) -> Result<(), Error> {
        let Some(ref creds) = self.credentials else {
            return Err(Error::Authentication {
                message: "username and password are required for login".into(),
            });
        };

        let body = json!({
            "username": creds.username,
            "password": creds.password.expose_secret(),
        });
        let url = self.path_url(LOGIN_PATH)?;
        debug!("POST {url}");

        // A failed login must not leave the previous session's token behind.
        self.clear_token();
        let resp = self.execute(self.http.post(url).json(&body), LOGIN_PATH).await?;
        if !resp.is_ok() {
            warn!(reason = resp.message(), "login failed");
            return Err(Error::Authentication {
                message: resp.message().to_owned(),
            });
        }

        let login = resp
            .data
            .and_then(|data| serde_json::from_value::<LoginData>(data).ok())
            .filter(|login| !login.token.is_empty())
            .ok_or_else(|| Error::Authentication {
                message: "login response carried no token".into(),
            })?;

        info!(
            user = login.alias.as_deref().unwrap_or(&creds.username),
            "login successful"
        );
        *self.auth_token.write().expect("token lock poisoned") =
            Some(SecretString::from(login.token));
        Ok(())
    }

    fn clear_token(&self) {
        *self.auth_token.write().expect("token lock poisoned") = None;
    }

    // ── URL builders ─────────────────────────────────────────────────

    pub(crate) fn path_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// `/api/<area>/<interface>/<rest>` for the configured interface.
    pub(crate) fn interface_path(&self, area: &str, rest: &str) -> String {
        format!("/api/{area}/{}/{rest}", self.interface.as_str())
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// `GET` with query parameters.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> TokenResponse<T> {
        match self.path_url(path) {
            Ok(url) => {
                debug!("GET {url}");
                self.dispatch(self.http.get(url).query(params), path).await
            }
            Err(e) => TokenResponse::error(e.to_string(), None),
        }
    }

    /// `POST` with a JSON body.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> TokenResponse<T> {
        match self.path_url(path) {
            Ok(url) => {
                debug!("POST {url}");
                self.dispatch(self.http.post(url).json(body), path).await
            }
            Err(e) => TokenResponse::error(e.to_string(), None),
        }
    }

    /// Send and fold every failure into the response value.
    async fn dispatch<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
    ) -> TokenResponse<T> {
        let resp = match self.execute(builder, path).await {
            Ok(resp) => resp,
            Err(e) if e.is_transient() => {
                warn!(path, error = %e, "device unreachable");
                return TokenResponse::error(e.to_string(), None);
            }
            Err(e) => {
                error!(path, error = %e, "request error");
                return TokenResponse::error(e.to_string(), None);
            }
        };

        match resp.data {
            Some(data) if resp.result == TokenResult::Ok => {
                match serde_json::from_value::<T>(data) {
                    Ok(data) => TokenResponse::ok(Some(data)),
                    Err(e) => {
                        error!(path, error = %e, "unexpected payload");
                        TokenResponse::error(format!("unexpected payload: {e}"), None)
                    }
                }
            }
            _ => TokenResponse {
                result: resp.result,
                data: None,
                msg: resp.msg,
                http_status: resp.http_status,
            },
        }
    }

    /// Attach the token, send, and normalize the body into a
    /// [`TokenResponse`]. Only transport failures come back as `Err`.
    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<TokenResponse<Value>, Error> {
        let builder = self.apply_token(builder);
        let resp = builder.send().await?;
        let status = resp.status();

        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                warn!(path, "received 401, unauthorized");
            }
            return Ok(TokenResponse::error(
                format!("API Error: {}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let body = resp.text().await?;
        Ok(normalize_body(&body))
    }

    fn apply_token(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let guard = self.auth_token.read().expect("token lock poisoned");
        let Some(token) = guard.as_ref() else {
            return builder;
        };
        match HeaderValue::from_str(token.expose_secret()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                builder.header(AUTHORIZATION, value)
            }
            Err(_) => {
                warn!("session token is not a valid header value, sending without it");
                builder
            }
        }
    }
}

/// Bodies carrying a `result` key are the device envelope; anything else
/// is a bare payload and counts as success.
fn normalize_body(body: &str) -> TokenResponse<Value> {
    let value: Value = if body.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                return TokenResponse::error(
                    format!(
                        "invalid JSON: {e} (body preview: {:?})",
                        transport::body_preview(body)
                    ),
                    None,
                );
            }
        }
    };

    let has_result = value.as_object().is_some_and(|map| map.contains_key("result"));
    if !has_result {
        return TokenResponse::ok(Some(value));
    }

    match serde_json::from_value::<RawEnvelope>(value) {
        Ok(raw) if raw.result.eq_ignore_ascii_case("ok") => TokenResponse {
            result: TokenResult::Ok,
            data: raw.data,
            msg: raw.msg,
            http_status: None,
        },
        Ok(raw) => TokenResponse {
            result: TokenResult::Error,
            data: raw.data,
            msg: raw.msg,
            http_status: None,
        },
        Err(e) => TokenResponse::error(format!("malformed envelope: {e}"), None),
    }
}
