// Token API codec, recording, and streamer endpoints
//
// Interface-scoped paths use the interface configured on the client.

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::token::client::TokenClient;
use crate::token::models::{
    RecordingStatusData, TokenResponse, TokenStream, device_type_from, parse_stream_list,
};

impl TokenClient {
    /// System info including firmware version. Doubles as the liveness probe.
    pub async fn device_info(&self) -> TokenResponse<Value> {
        self.get("/api/systemctrl/system/getSystemInfo", &[("version", "true")])
            .await
    }

    /// Product name extracted from [`device_info`](Self::device_info).
    pub async fn device_type(&self) -> TokenResponse<Option<String>> {
        self.device_info().await.map(|data| device_type_from(&data))
    }

    /// Whether the configured interface currently has an active input.
    pub async fn check_encoder_status(&self) -> TokenResponse<bool> {
        let iface = self.interface().as_str();
        self.get::<Value>("/api/codec/vin/active_interface", &[])
            .await
            .map(|data| data.get(iface).and_then(Value::as_bool).unwrap_or(false))
    }

    /// Turn on the video encoder for the configured interface.
    pub async fn enable_encoder(&self) -> TokenResponse<Value> {
        let iface = self.interface();
        let path = format!("/api/codec/{}/venc/enable", iface.as_str());
        let resp = self.post(&path, &json!({ "enable": true })).await;
        if resp.is_ok() {
            info!(interface = %iface, "encoder enabled");
        } else {
            warn!(interface = %iface, reason = resp.message(), "encoder enable failed");
        }
        resp
    }

    /// Recording status of the configured interface (shared by all streams).
    pub async fn recording_status(&self) -> TokenResponse<RecordingStatusData> {
        let path = self.interface_path("record", "get_recording_status");
        self.get(&path, &[]).await
    }

    /// Start (`true`) or stop (`false`) recording on the configured interface.
    pub async fn enable_recording(&self, start: bool) -> TokenResponse<Value> {
        let path = self.interface_path("record", "recording");
        self.post(&path, &json!({ "start": start })).await
    }

    /// Streaming outputs of the configured interface, RTSP excluded.
    pub async fn stream_list(&self) -> TokenResponse<Vec<TokenStream>> {
        let path = self.interface_path("streamer", "stream/list");
        self.get::<Value>(&path, &[]).await.map(|data| {
            parse_stream_list(&data)
                .into_iter()
                .filter(|s| !s.is_rtsp())
                .collect()
        })
    }

    /// Enable or disable one streaming output by id.
    pub async fn set_stream_service(&self, id: &str, enabled: bool) -> TokenResponse<Value> {
        let path = self.interface_path("streamer", "stream/enable");
        // Numeric ids go back out as numbers.
        let id = id
            .parse::<i64>()
            .map_or_else(|_| Value::String(id.to_owned()), Value::from);
        self.post(&path, &json!({ "id": id, "enable": enabled })).await
    }
}
