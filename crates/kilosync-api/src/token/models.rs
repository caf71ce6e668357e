// Token API request/response types
//
// The device answers `{result: "ok"|"error", data?, msg?}`; some endpoints
// return a bare payload, which the client wraps as `ok`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::de;

/// Login endpoint (fixed across firmware versions).
pub const LOGIN_PATH: &str = "/api/systemctrl/users/login";

/// Stream protocol that is always on and hidden from the service list.
pub const RTSP_PROTOCOL: &str = "rtsp";

/// Recording status string that means "recording".
pub const RECORDING_ACTIVE_STATUS: &str = "started";

// ── Interface ────────────────────────────────────────────────────────

/// Video input an E3 operation is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoInterface {
    #[default]
    Hdmi,
    Sdi,
    /// Picture-in-picture mix of both inputs.
    Pip,
    /// USB capture.
    Uvc,
}

impl VideoInterface {
    pub const ALL: [Self; 4] = [Self::Pip, Self::Hdmi, Self::Sdi, Self::Uvc];

    /// Path segment used in `/api/<area>/<interface>/...`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hdmi => "hdmi",
            Self::Sdi => "sdi",
            Self::Pip => "pip",
            Self::Uvc => "uvc",
        }
    }

    /// Operator-facing name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Hdmi => "HDMI",
            Self::Sdi => "SDI",
            Self::Pip => "MIX",
            Self::Uvc => "USB",
        }
    }
}

impl fmt::Display for VideoInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoInterface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hdmi" => Ok(Self::Hdmi),
            "sdi" => Ok(Self::Sdi),
            "pip" | "mix" => Ok(Self::Pip),
            "uvc" | "usb" => Ok(Self::Uvc),
            other => Err(format!("unknown video interface '{other}'")),
        }
    }
}

// ── Envelope ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenResult {
    Ok,
    Error,
}

/// Uniform outcome of every token API call.
#[derive(Debug, Clone)]
pub struct TokenResponse<T = Value> {
    pub result: TokenResult,
    pub data: Option<T>,
    pub msg: Option<String>,
    /// HTTP status when the failure came from a non-2xx response.
    pub http_status: Option<u16>,
}

impl<T> TokenResponse<T> {
    pub fn ok(data: Option<T>) -> Self {
        Self {
            result: TokenResult::Ok,
            data,
            msg: None,
            http_status: None,
        }
    }

    pub fn error(msg: impl Into<String>, http_status: Option<u16>) -> Self {
        Self {
            result: TokenResult::Error,
            data: None,
            msg: Some(msg.into()),
            http_status,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result == TokenResult::Ok
    }

    /// The device rejected our token (or lack of one).
    pub fn is_unauthorized(&self) -> bool {
        self.http_status == Some(401)
    }

    pub fn message(&self) -> &str {
        self.msg.as_deref().unwrap_or("unknown error")
    }

    /// Transform the payload, keeping the outcome.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TokenResponse<U> {
        TokenResponse {
            result: self.result,
            data: self.data.map(f),
            msg: self.msg,
            http_status: self.http_status,
        }
    }
}

/// Wire shape of an envelope-carrying body.
#[derive(Debug, Deserialize)]
pub(crate) struct RawEnvelope {
    pub result: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub msg: Option<String>,
}

// ── Payloads ─────────────────────────────────────────────────────────

/// `data` of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
    #[serde(default)]
    pub alias: Option<String>,
}

/// `data` of `get_recording_status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordingStatusData {
    #[serde(default)]
    pub status: Option<String>,
}

impl RecordingStatusData {
    pub fn is_recording(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(RECORDING_ACTIVE_STATUS))
    }
}

/// One entry of the interface's stream list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenStream {
    #[serde(deserialize_with = "de::string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "type")]
    pub protocol: String,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub enable: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Which encoder stream feeds this output (`main`/`sub`); absent means main.
    #[serde(default)]
    pub stream: Option<String>,
}

impl TokenStream {
    pub fn is_rtsp(&self) -> bool {
        self.protocol.eq_ignore_ascii_case(RTSP_PROTOCOL)
    }
}

/// Pull stream entries out of a list payload.
///
/// Firmware returns either a bare array or an object wrapping it under
/// `list`/`streams`. Entries that do not parse are skipped.
pub(crate) fn parse_stream_list(data: &Value) -> Vec<TokenStream> {
    let entries = match data {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => ["list", "streams", "stream"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map_or(&[][..], Vec::as_slice),
        _ => &[],
    };

    entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<TokenStream>(entry.clone()).ok())
        .collect()
}

/// Best-effort product name from `getSystemInfo`.
pub(crate) fn device_type_from(data: &Value) -> Option<String> {
    ["model", "device_type", "product", "name"]
        .iter()
        .find_map(|key| data.get(*key).and_then(Value::as_str))
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interface_parses_labels_and_ids() {
        assert_eq!("HDMI".parse::<VideoInterface>().unwrap(), VideoInterface::Hdmi);
        assert_eq!("mix".parse::<VideoInterface>().unwrap(), VideoInterface::Pip);
        assert_eq!("usb".parse::<VideoInterface>().unwrap(), VideoInterface::Uvc);
        assert!("vga".parse::<VideoInterface>().is_err());
        assert_eq!(VideoInterface::default().as_str(), "hdmi");
    }

    #[test]
    fn stream_list_accepts_wrapped_and_bare_arrays() {
        let bare = json!([{ "id": 1, "protocol": "rtmp", "enable": true }]);
        let wrapped = json!({ "list": [{ "id": 1, "type": "srt", "enable": 0, "stream": "sub" }] });

        let bare = parse_stream_list(&bare);
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].id, "1");
        assert!(bare[0].enable);

        let wrapped = parse_stream_list(&wrapped);
        assert_eq!(wrapped[0].protocol, "srt");
        assert_eq!(wrapped[0].stream.as_deref(), Some("sub"));
        assert!(!wrapped[0].enable);

        assert!(parse_stream_list(&json!("nope")).is_empty());
    }

    #[test]
    fn device_type_prefers_model() {
        let data = json!({ "name": "studio-a", "model": "E3" });
        assert_eq!(device_type_from(&data).as_deref(), Some("E3"));
        assert_eq!(device_type_from(&json!({})), None);
    }
}
