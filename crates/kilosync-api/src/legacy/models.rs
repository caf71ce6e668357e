// Legacy API response types
//
// All responses are wrapped in the `LegacyResponse<T>` envelope. Fields use
// `#[serde(default)]` liberally because field presence varies across
// firmware versions.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::de;

/// Envelope `Result` code meaning success.
pub const SUCCESS_RESULT: i64 = 200;

/// Service type that is always running and never user-controllable.
pub const RTSP_SERVICE_TYPE: &str = "Rtsp_server";

/// The only recording status string that means "recording".
pub const RECORDING_ACTIVE_STATUS: &str = "started";

// ── Response Envelope ────────────────────────────────────────────────

/// Standard legacy envelope:
/// ```json
/// { "Result": 200, "Status": "OK", "Data": { ... } }
/// ```
/// `Result != 200` is a logical failure even when HTTP says 200.
#[derive(Debug, Deserialize)]
pub struct LegacyResponse<T> {
    #[serde(rename = "Result")]
    pub result: i64,
    #[serde(rename = "Status", default)]
    pub status: Option<Value>,
    #[serde(rename = "Data")]
    pub data: Option<T>,
}

impl<T> LegacyResponse<T> {
    pub fn is_success(&self) -> bool {
        self.result == SUCCESS_RESULT
    }

    /// Human-readable `Status`, whatever JSON type the device sent.
    pub fn status_text(&self) -> String {
        match &self.status {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

// ── Device ───────────────────────────────────────────────────────────

/// `deviceInfo` payload. Only the product type is modelled; the rest
/// lands in `extra`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "OEM_TYPE", default)]
    pub oem_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Recording ────────────────────────────────────────────────────────

/// `getRecordingStatus` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordingStatus {
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

impl RecordingStatus {
    /// `"started"` in any letter case means recording; everything else,
    /// including a missing status, does not.
    pub fn is_recording(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(RECORDING_ACTIVE_STATUS))
    }
}

// ── Services ─────────────────────────────────────────────────────────

/// `getStreamService` payload. A disabled stream reports an empty or
/// null `ServiceStatus`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamServices {
    #[serde(
        rename = "ServiceStatus",
        default,
        deserialize_with = "de::null_as_empty"
    )]
    pub service_status: Vec<ServiceStatus>,
}

/// One streaming output bound to a stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceStatus {
    #[serde(rename = "ID", deserialize_with = "de::string_or_number")]
    pub id: String,
    #[serde(rename = "Type")]
    pub service_type: String,
    #[serde(rename = "Enable", default, deserialize_with = "de::flexible_bool")]
    pub enable: bool,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
}

impl ServiceStatus {
    pub fn is_rtsp(&self) -> bool {
        self.service_type == RTSP_SERVICE_TYPE
    }
}

// ── Streaming mode ───────────────────────────────────────────────────

/// `getStreamingMode` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamingMode {
    #[serde(rename = "Mode", default)]
    pub mode: Option<String>,
}

impl StreamingMode {
    /// `Some(true)` unless the device reports `"main"`; `None` when the
    /// mode is absent or empty.
    pub fn is_multi_stream(&self) -> Option<bool> {
        self.mode
            .as_deref()
            .filter(|m| !m.is_empty())
            .map(|m| m != "main")
    }
}
