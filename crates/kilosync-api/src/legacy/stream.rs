// Legacy API recording, service, and mode endpoints
//
// Every method takes the stream name (`main`, `sub`, `main+sub`) as the
// `Stream` parameter where the device expects one.

use tracing::debug;

use crate::error::Error;
use crate::legacy::client::LegacyClient;
use crate::legacy::models::{
    DeviceInfo, RecordingStatus, ServiceStatus, StreamServices, StreamingMode,
};

impl LegacyClient {
    /// Device identity (`deviceInfo`). Doubles as the liveness probe.
    pub async fn device_info(&self) -> Result<DeviceInfo, Error> {
        self.call("deviceInfo", &[]).await
    }

    /// Current recording status of one stream.
    pub async fn recording_status(&self, stream: &str) -> Result<RecordingStatus, Error> {
        self.call("getRecordingStatus", &[("Stream", stream)]).await
    }

    pub async fn start_record(&self, stream: &str) -> Result<(), Error> {
        debug!(stream, "starting recording");
        self.execute("startRecord", &[("Stream", stream)]).await
    }

    pub async fn stop_record(&self, stream: &str) -> Result<(), Error> {
        debug!(stream, "stopping recording");
        self.execute("stopRecord", &[("Stream", stream)]).await
    }

    /// User-controllable services of one stream. RTSP is filtered out; an
    /// empty list means the stream has no outputs right now.
    pub async fn stream_services(&self, stream: &str) -> Result<Vec<ServiceStatus>, Error> {
        let services: StreamServices = self.call("getStreamService", &[("Stream", stream)]).await?;
        Ok(services
            .service_status
            .into_iter()
            .filter(|s| !s.is_rtsp())
            .collect())
    }

    /// Enable or disable one service. The device keys the flag by type:
    /// `{Stream, ID, Type, "<Type>.enabled": 0|1}`.
    pub async fn set_stream_service(
        &self,
        stream: &str,
        id: &str,
        service_type: &str,
        enabled: bool,
    ) -> Result<(), Error> {
        let flag_key = format!("{service_type}.enabled");
        let flag = if enabled { "1" } else { "0" };
        debug!(stream, id, service_type, enabled, "setting stream service");
        self.execute(
            "setStreamService",
            &[
                ("Stream", stream),
                ("ID", id),
                ("Type", service_type),
                (flag_key.as_str(), flag),
            ],
        )
        .await
    }

    /// Single- vs multi-stream configuration.
    pub async fn streaming_mode(&self) -> Result<StreamingMode, Error> {
        self.call("getStreamingMode", &[]).await
    }
}
