// Token REST API mapped onto the adapter operations.
//
// Recording is per interface, so every stream identity reports the same
// state. Services are split across streams by each entry's `stream` field.

use kilosync_api::{TokenClient, TokenResponse};
use tracing::info;

use crate::adapter::DeviceAdapter;
use crate::error::CoreError;
use crate::model::{DeviceIdentity, ServiceDescriptor, StreamId};

/// Turn a token response into the engine's error vocabulary.
fn into_result<T>(resp: TokenResponse<T>, operation: &str) -> Result<Option<T>, CoreError> {
    if resp.is_ok() {
        return Ok(resp.data);
    }
    if resp.is_unauthorized() {
        return Err(CoreError::AuthenticationFailed {
            message: "Unauthorized".into(),
        });
    }
    Err(CoreError::Envelope {
        operation: operation.to_owned(),
        message: resp.message().to_owned(),
    })
}

fn stream_matches(entry_stream: Option<&str>, stream: StreamId) -> bool {
    match entry_stream.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => name.eq_ignore_ascii_case(stream.as_str()),
        None => stream == StreamId::Main,
    }
}

impl DeviceAdapter for TokenClient {
    async fn prepare(&self) -> Result<(), CoreError> {
        if !self.requires_login() {
            return Ok(());
        }
        self.login().await?;
        info!(interface = %self.interface(), "token session established");
        Ok(())
    }

    async fn device_identity(&self) -> Result<DeviceIdentity, CoreError> {
        let device_type = into_result(self.device_type().await, "getSystemInfo")?.flatten();
        Ok(DeviceIdentity { device_type })
    }

    // E3 units always run main and sub side by side.
    async fn multi_stream_mode(&self) -> Result<Option<bool>, CoreError> {
        Ok(Some(true))
    }

    async fn stream_services(&self, stream: StreamId) -> Result<Vec<ServiceDescriptor>, CoreError> {
        let entries = into_result(self.stream_list().await, "stream/list")?.unwrap_or_default();
        Ok(entries
            .into_iter()
            .filter(|entry| stream_matches(entry.stream.as_deref(), stream))
            .map(ServiceDescriptor::from)
            .collect())
    }

    async fn recording_state(&self, _stream: StreamId) -> Result<bool, CoreError> {
        let status = into_result(self.recording_status().await, "get_recording_status")?;
        Ok(status.is_some_and(|s| s.is_recording()))
    }

    async fn set_recording(&self, _stream: StreamId, recording: bool) -> Result<(), CoreError> {
        into_result(self.enable_recording(recording).await, "recording")?;
        Ok(())
    }

    async fn set_service(
        &self,
        _stream: StreamId,
        service: &ServiceDescriptor,
        enabled: bool,
    ) -> Result<(), CoreError> {
        into_result(
            self.set_stream_service(&service.id, enabled).await,
            "stream/enable",
        )?;
        Ok(())
    }

    async fn enable_encoder(&self) -> Result<(), CoreError> {
        into_result(TokenClient::enable_encoder(self).await, "venc/enable")?;
        Ok(())
    }

    async fn encoder_status(&self) -> Result<bool, CoreError> {
        let active = into_result(self.check_encoder_status().await, "active_interface")?;
        Ok(active.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_without_stream_belong_to_main() {
        assert!(stream_matches(None, StreamId::Main));
        assert!(!stream_matches(None, StreamId::Sub));
        assert!(stream_matches(Some("SUB"), StreamId::Sub));
        assert!(stream_matches(Some(""), StreamId::Main));
    }

    #[test]
    fn unauthorized_response_is_auth_error() {
        let resp: TokenResponse<()> = TokenResponse::error("API Error: 401", Some(401));
        let err = into_result(resp, "stream/list").unwrap_err();
        assert!(err.is_auth());

        let resp: TokenResponse<()> = TokenResponse::error("busy", None);
        let err = into_result(resp, "stream/list").unwrap_err();
        assert!(err.is_envelope());
    }
}
